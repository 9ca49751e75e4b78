use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use thiserror::Error;

/// Magic token of the binary (raw) PPM variant.
pub const PPM_MAGIC: &str = "P6";
/// Maximum channel value written in the header.
pub const PPM_MAX_VALUE: u8 = 255;

pub type PpmResult<T> = Result<T, PpmError>;

#[derive(Debug, Error)]
pub enum PpmError {
    #[error("cannot allocate a {width}x{height} image")]
    Allocation { width: u32, height: u32 },

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write ppm stream: {0}")]
    Write(#[from] io::Error),

    #[error("image is not initialized")]
    InvalidHandle,

    #[error("pixel ({x}, {y}) is outside of a {width}x{height} image")]
    OutOfRange {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    #[error("pixel buffer holds {actual} pixels, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
}

/// A single RGB pixel, one byte per channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Pixel {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn set(&mut self, r: u8, g: u8, b: u8) {
        self.r = r;
        self.g = g;
        self.b = b;
    }
}

impl From<(u8, u8, u8)> for Pixel {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self { r, g, b }
    }
}

impl From<Pixel> for (u8, u8, u8) {
    fn from(px: Pixel) -> Self {
        (px.r, px.g, px.b)
    }
}

/// An RGB raster stored row-major, which can be written out as a binary PPM.
///
/// A `Ppm` starts out uninitialized (see [`Ppm::new`]) and owns no storage
/// until [`Ppm::init`] succeeds. The storage is freed by [`Ppm::release`] or
/// when the image is dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ppm {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
}

impl Ppm {
    /// Creates an uninitialized image with no backing storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and initializes a `width` by `height` image.
    ///
    /// # Arguments
    ///
    /// * 'width' - Number of columns, must be non-zero.
    /// * 'height' - Number of rows, must be non-zero.
    ///
    /// # Returns
    ///
    /// A result containing either the black image or a PpmError::Allocation.
    pub fn build(width: u32, height: u32) -> PpmResult<Self> {
        let mut ppm = Self::new();
        ppm.init(width, height)?;
        Ok(ppm)
    }

    /// Creates an image from a row-major buffer of `width * height` pixels.
    pub fn from_pixels<T>(data: &[T], width: u32, height: u32) -> PpmResult<Self>
    where
        T: Copy + Into<Pixel>,
    {
        let expected = Self::buffer_len(width, height)?;
        if data.len() != expected {
            return Err(PpmError::BufferSize {
                expected,
                actual: data.len(),
            });
        }

        let mut ppm = Self::build(width, height)?;
        for (dst, src) in ppm.pixels.iter_mut().zip(data) {
            *dst = (*src).into();
        }
        Ok(ppm)
    }

    /// Allocates storage for `width * height` pixels, replacing any previous
    /// storage. Every pixel starts out black.
    ///
    /// On failure the image is left uninitialized.
    pub fn init(&mut self, width: u32, height: u32) -> PpmResult<()> {
        self.clear();

        let len = Self::buffer_len(width, height)?;
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|_| PpmError::Allocation { width, height })?;
        pixels.resize(len, Pixel::default());

        self.width = width;
        self.height = height;
        self.pixels = pixels;

        log::debug!("initialized {width}x{height} ppm image");
        Ok(())
    }

    /// Frees the pixel storage and returns the image to the uninitialized
    /// state. Releasing an image that holds no storage is an error.
    pub fn release(&mut self) -> PpmResult<()> {
        if !self.is_initialized() {
            return Err(PpmError::InvalidHandle);
        }

        log::debug!("releasing {}x{} ppm image", self.width, self.height);
        self.clear();
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        !self.pixels.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Row-major view of every pixel.
    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Pixel] {
        &mut self.pixels
    }

    /// Sets the pixel at column `x`, row `y` (row 0 is the top).
    pub fn set_pixel(&mut self, x: u32, y: u32, r: u8, g: u8, b: u8) -> PpmResult<()> {
        let idx = self.index(x, y)?;
        self.pixels[idx].set(r, g, b);
        Ok(())
    }

    pub fn pixel(&self, x: u32, y: u32) -> PpmResult<Pixel> {
        let idx = self.index(x, y)?;
        Ok(self.pixels[idx])
    }

    pub fn fill(&mut self, px: Pixel) {
        self.pixels.fill(px);
    }

    /// The ASCII header, e.g. `"P6\n2 3\n255\n"`.
    pub fn header(&self) -> String {
        format!(
            "{PPM_MAGIC}\n{} {}\n{PPM_MAX_VALUE}\n",
            self.width, self.height
        )
    }

    /// Encodes the whole file (header followed by raw RGB payload) in memory.
    pub fn to_bytes(&self) -> PpmResult<Vec<u8>> {
        let mut file_bytes = Vec::with_capacity(self.pixels.len() * 3 + 16);
        self.write_to(&mut file_bytes)?;
        Ok(file_bytes)
    }

    /// Writes the header and the payload to `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> PpmResult<()> {
        if !self.is_initialized() {
            return Err(PpmError::InvalidHandle);
        }

        self.encode(writer)?;
        Ok(())
    }

    /// Writes the image to `path` as a binary PPM, creating or truncating
    /// the file.
    ///
    /// # Arguments
    ///
    /// * 'path' - The output file path, can be any type that implements into path.
    ///
    /// # Returns
    ///
    /// An empty result, or the first error hit while creating or writing the
    /// file. A partially written file is left in place.
    pub fn dump<P: AsRef<Path>>(&self, path: P) -> PpmResult<()> {
        let path = path.as_ref();

        if !self.is_initialized() {
            return Err(PpmError::InvalidHandle);
        }

        let result = File::create(path)
            .and_then(|file| {
                let mut out = BufWriter::new(file);
                self.encode(&mut out)?;
                out.flush()
            })
            .map_err(|source| PpmError::Io {
                path: path.to_path_buf(),
                source,
            });

        match &result {
            Ok(()) => log::debug!(
                "wrote {}x{} ppm to {}",
                self.width,
                self.height,
                path.display()
            ),
            Err(e) => log::warn!("ppm dump failed: {e}"),
        }

        result
    }

    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(self.header().as_bytes())?;
        for px in &self.pixels {
            writer.write_all(&[px.r, px.g, px.b])?;
        }
        Ok(())
    }

    fn index(&self, x: u32, y: u32) -> PpmResult<usize> {
        if !self.is_initialized() {
            return Err(PpmError::InvalidHandle);
        }
        if x >= self.width || y >= self.height {
            return Err(PpmError::OutOfRange {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(y as usize * self.width as usize + x as usize)
    }

    // Pixel count for the given dimensions; the byte size must fit in usize too.
    fn buffer_len(width: u32, height: u32) -> PpmResult<usize> {
        if width == 0 || height == 0 {
            return Err(PpmError::Allocation { width, height });
        }

        let len = (width as usize)
            .checked_mul(height as usize)
            .ok_or(PpmError::Allocation { width, height })?;
        len.checked_mul(3)
            .ok_or(PpmError::Allocation { width, height })?;

        Ok(len)
    }

    fn clear(&mut self) {
        self.width = 0;
        self.height = 0;
        self.pixels = Vec::new();
    }
}
