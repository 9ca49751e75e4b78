use std::{error::Error, fs, path::PathBuf};

use ppmbuf::{Pixel, Ppm, PpmError};

fn output_path(name: &str) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/output");
    fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

#[test]
fn dump_writes_header_and_payload() -> Result<(), Box<dyn Error>> {
    let mut ppm = Ppm::build(2, 3)?;
    ppm.fill(Pixel::new(12, 34, 56));

    let path = output_path("filled_2x3.ppm");
    ppm.dump(&path)?;

    let bytes = fs::read(&path)?;
    let mut expected = b"P6\n2 3\n255\n".to_vec();
    for _ in 0..6 {
        expected.extend_from_slice(&[0x0c, 0x22, 0x38]);
    }
    assert_eq!(bytes, expected);

    Ok(())
}

#[test]
fn file_size_is_header_plus_payload() -> Result<(), Box<dyn Error>> {
    let ppm = Ppm::build(17, 9)?;
    let path = output_path("size_17x9.ppm");
    ppm.dump(&path)?;

    let len = fs::metadata(&path)?.len() as usize;
    assert_eq!(len, "P6\n17 9\n255\n".len() + 17 * 9 * 3);

    Ok(())
}

#[test]
fn dumping_twice_is_deterministic() -> Result<(), Box<dyn Error>> {
    let mut ppm = Ppm::build(5, 4)?;
    for y in 0..4 {
        for x in 0..5 {
            ppm.set_pixel(x, y, (x * 40) as u8, (y * 60) as u8, (x + y) as u8)?;
        }
    }

    let first = output_path("determinism_a.ppm");
    let second = output_path("determinism_b.ppm");
    ppm.dump(&first)?;
    ppm.dump(&second)?;

    assert_eq!(fs::read(&first)?, fs::read(&second)?);
    assert_eq!(fs::read(&first)?, ppm.to_bytes()?);

    Ok(())
}

#[test]
fn dump_into_missing_directory_fails() -> Result<(), Box<dyn Error>> {
    let ppm = Ppm::build(1, 1)?;
    let path = output_path("no_such_dir/nested/out.ppm");

    match ppm.dump(&path) {
        Err(PpmError::Io { path: failed, source }) => {
            assert_eq!(failed, path);
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("expected an io error, got {other:?}"),
    }
    assert!(!path.exists());

    Ok(())
}

#[test]
fn dump_after_release_is_rejected() -> Result<(), Box<dyn Error>> {
    let mut ppm = Ppm::build(2, 2)?;
    ppm.release()?;

    let path = output_path("released.ppm");
    let _ = fs::remove_file(&path);

    assert!(matches!(ppm.dump(&path), Err(PpmError::InvalidHandle)));
    assert!(!path.exists());

    Ok(())
}

#[test]
fn decoded_by_independent_reader() -> Result<(), Box<dyn Error>> {
    let mut ppm = Ppm::new();
    ppm.init(4, 2)?;

    let mut expected = Vec::new();
    for y in 0..2u32 {
        for x in 0..4u32 {
            let i = (y * 4 + x) as u8;
            let px = Pixel::new(i * 30, 255 - i * 20, i + 100);
            ppm.set_pixel(x, y, px.r, px.g, px.b)?;
            expected.push((x, y, px));
        }
    }

    let path = output_path("roundtrip_4x2.ppm");
    ppm.dump(&path)?;

    let decoded = image::open(&path)?.to_rgb8();
    assert_eq!(decoded.dimensions(), (4, 2));
    for (x, y, px) in expected {
        assert_eq!(decoded.get_pixel(x, y).0, [px.r, px.g, px.b]);
    }

    ppm.release()?;
    assert!(matches!(ppm.release(), Err(PpmError::InvalidHandle)));

    Ok(())
}
