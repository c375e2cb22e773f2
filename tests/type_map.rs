use std::{error::Error, sync::Arc};

use nexusfile::{
    backend::{AccessMode, MemoryConnector},
    File, NexusError, TypeMap,
};

fn monitor_file() -> Result<File, Box<dyn Error>> {
    let mut file = File::open_with(Arc::new(MemoryConnector::new()), "map", AccessMode::Create)?;
    file.make_group("entry", "NXentry", true)?;
    file.write_data("data", &[1.0f64, 2.0])?;
    file.make_group("monitor", "NXmonitor", true)?;
    file.write_data("counts", &[3i32, 4])?;
    file.close_group()?;
    file.close_group()?;
    Ok(file)
}

#[test]
fn type_map_completeness() -> Result<(), Box<dyn Error>> {
    let file = monitor_file()?;
    let mut map = TypeMap::new();
    file.walk_file_for_type_map("/", "", &mut map)?;
    assert_eq!(map.len(), 2);
    assert_eq!(map.paths("FLOAT64"), ["/entry/data"]);
    assert_eq!(map.paths("INT32"), ["/entry/monitor/counts"]);
    assert_eq!(map, file.get_type_map()?);
    Ok(())
}

#[test]
fn type_map_accumulates() -> Result<(), Box<dyn Error>> {
    let mut file = monitor_file()?;
    file.open_path("/entry/monitor")?;
    let mut map = TypeMap::new();
    file.walk_file_for_type_map(".", "NXmonitor", &mut map)?;
    file.walk_file_for_type_map("/entry/monitor", "", &mut map)?;
    assert_eq!(map.paths("INT32"), ["/entry/monitor/counts", "/entry/monitor/counts"]);
    assert_eq!(file.get_path()?, "/entry/monitor");

    assert!(matches!(
        file.walk_file_for_type_map("/entry", "NXmonitor", &mut map),
        Err(NexusError::TypeMismatch(_))
    ));
    assert!(matches!(
        file.walk_file_for_type_map("/missing", "", &mut map),
        Err(NexusError::NotFound(_))
    ));
    Ok(())
}

#[test]
fn type_map_classes() -> Result<(), Box<dyn Error>> {
    let file = monitor_file()?;
    let classes = file.get_class_map()?;
    assert_eq!(classes.paths("NXentry"), ["/entry"]);
    assert_eq!(classes.paths("NXmonitor"), ["/entry/monitor"]);
    assert_eq!(classes.paths("SDS"), ["/entry/data", "/entry/monitor/counts"]);
    assert_eq!(classes.num_paths(), 4);
    Ok(())
}

#[test]
fn type_map_skips_external_links() -> Result<(), Box<dyn Error>> {
    let connector = Arc::new(MemoryConnector::new());
    {
        let mut other = File::open_with(connector.clone(), "other", AccessMode::Create)?;
        other.write_data("hidden", &[1u8])?;
    }
    let mut file = File::open_with(connector, "main", AccessMode::Create)?;
    file.write_data("visible", &[1u8])?;
    file.link_external("other", "NXentry", "nxfile://other")?;
    let map = file.get_type_map()?;
    assert_eq!(map.paths("UINT8"), ["/visible"]);
    Ok(())
}
