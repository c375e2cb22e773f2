#![cfg(not(miri))]

use std::error::Error;

use nexusfile::{
    config::global_config, AccessMode, Compression, File, NexusError, NumType, Position, UNLIMITED,
};

#[test]
fn filesystem_persistence() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("scan.nxs");
    {
        let mut file = File::open(&path, AccessMode::Create)?;
        file.put_attr_str("file_name", "scan.nxs")?;
        file.make_group("entry", "NXentry", true)?;
        file.write_str("title", "powder")?;
        file.make_comp_data("frames", NumType::Float32, &[UNLIMITED, 2], Compression::Lzw, &[4, 2], true)?;
        file.put_slab(&[1.0f32, 2.0, 3.0, 4.0], &[0, 0], &[2, 2])?;
        file.put_attr("signal", 1i32)?;
        let frames = file.get_data_id()?;
        file.close_data()?;
        file.make_group("data", "NXdata", true)?;
        file.make_link(&frames)?;
        file.close()?;
    }
    assert!(path.join(".nexus.json").is_file());
    assert!(path.join("entry").join(".nexus.json").is_file());
    let chunk = std::fs::read(path.join("entry/frames/c/0/0"))?;
    assert_eq!(chunk.get(..2), Some(&[0x1f, 0x8b][..]));

    let mut file = File::open(&path, AccessMode::Read)?;
    assert_eq!(file.get_attr_str("file_name")?, "scan.nxs");
    file.open_path("/entry/data/frames")?;
    assert_eq!(file.get_info()?.dims, vec![2, 2]);
    assert_eq!(file.get_data_vec::<f64>()?, vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(file.get_attr::<i32>("signal")?, 1);
    file.open_path("/entry/title")?;
    assert_eq!(file.get_str_data()?, "powder");
    assert!(matches!(
        file.put_data(&[0u8]),
        Err(NexusError::TypeMismatch(_))
    ));
    file.close_data()?;
    assert!(matches!(
        file.make_group("more", "NXcollection", false),
        Err(NexusError::StorageError(_))
    ));
    file.close()?;
    assert_eq!(file.position(), Position::Closed);
    Ok(())
}

#[test]
fn filesystem_access_modes() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("modes");
    assert!(matches!(
        File::open(&path, AccessMode::ReadWrite),
        Err(NexusError::OpenError(_))
    ));
    assert!(!path.exists());

    File::open(&path, AccessMode::Create)?.make_group("entry", "NXentry", false)?;
    assert!(matches!(
        File::open(&path, AccessMode::Create),
        Err(NexusError::OpenError(_))
    ));

    {
        let mut file = File::open(&path, AccessMode::ReadWrite)?;
        file.open_group("entry", "NXentry")?;
        file.write_extendible_data("log", &[1u64, 2], None)?;
        file.write_updated_data("log", &[1u64, 2, 3])?;
        file.flush()?;
    }
    {
        let mut file = File::open(&path, AccessMode::Read)?;
        file.open_group("entry", "")?;
        assert_eq!(file.read_data::<u64>("log")?, vec![1, 2, 3]);
    }

    let mut file = File::open(&path, AccessMode::CreateOverwrite)?;
    assert!(file.get_entries()?.is_empty());
    file.close()?;
    Ok(())
}

#[test]
fn filesystem_small_write_small_chunk() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("image.nxs");
    let mut file = File::open(&path, AccessMode::Create)?;
    file.make_data("img", NumType::Float64, &[2000, 2000], true)?;
    file.put_slab(&[1.0f64], &[0, 0], &[1, 1])?;
    file.put_slab(&[2.0f64], &[1999, 1999], &[1, 1])?;
    assert_eq!(file.get_slab::<f64>(&[0, 0], &[1, 2])?, vec![1.0, 0.0]);
    file.close()?;

    let chunks: Vec<_> = walkdir::WalkDir::new(path.join("img").join("c"))
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .collect();
    assert_eq!(chunks.len(), 2);
    for chunk in chunks {
        assert!(chunk.metadata()?.len() <= global_config().default_chunk_bytes());
    }
    Ok(())
}
