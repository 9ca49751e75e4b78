pub mod formats;

pub use formats::ppm::{Pixel, Ppm, PpmError, PpmResult};
