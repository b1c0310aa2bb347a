//! Node, link, and core-node listing writers.

use std::fs;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};
use log::info;

use crate::config::CoreListLocation;
use crate::sampler::SampleRun;

/// Write the accepted node ids, one per line
pub fn write_nodes(run: &SampleRun, dir: &Path) -> Result<()> {
    let mut content = String::new();
    for node in run.sampled_nodes() {
        content.push_str(&format!("{}\n", node));
    }
    let path = dir.join("nodes");
    fs::write(&path, content)
        .wrap_err_with(|| format!("Failed to write nodes file '{}'", path.display()))
}

/// Write the undirected link list, one `a - b` pair per line
pub fn write_links(run: &SampleRun, dir: &Path) -> Result<()> {
    let mut content = String::new();
    for (a, b) in run.sampled_links() {
        content.push_str(&format!("{} - {}\n", a, b));
    }
    let path = dir.join("links");
    fs::write(&path, content)
        .wrap_err_with(|| format!("Failed to write links file '{}'", path.display()))
}

/// Resolve where the core-node listing goes for this run
pub fn core_list_path(location: CoreListLocation, map_path: &Path, output_dir: &Path) -> PathBuf {
    let stem = map_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "map".to_string());
    let filename = format!("{}-corenodes.txt", stem);
    match location {
        CoreListLocation::Output => output_dir.join(filename),
        CoreListLocation::Map => map_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(filename),
    }
}

/// Write the pre-walk core-node candidate listing
pub fn write_core_nodes(core_nodes: &[u32], path: &Path) -> Result<()> {
    let mut content = String::new();
    for node in core_nodes {
        content.push_str(&format!("{}\n", node));
    }
    fs::write(path, content)
        .wrap_err_with(|| format!("Failed to write core node listing '{}'", path.display()))?;
    info!("Collected {} core nodes in {}", core_nodes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cnml::NetworkMap;
    use crate::sampler::TopologySampler;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::tempdir;

    fn sample_run() -> SampleRun {
        let map = NetworkMap::from_xml_str(
            r#"
            <cnml>
                <node id="1" status="Working" links="2">
                    <interface id="11" ipv4="172.16.0.1">
                        <link id="500" linked_node_id="2" linked_interface_id="21"/>
                    </interface>
                </node>
                <node id="2" status="Working" links="2">
                    <interface id="21" ipv4="172.16.0.2">
                        <link id="501" linked_node_id="1" linked_interface_id="11"/>
                    </interface>
                </node>
            </cnml>
            "#,
        )
        .unwrap();
        let rng = StdRng::seed_from_u64(1);
        let mut sampler =
            TopologySampler::new(&map, "172.0.0.0/8".parse().unwrap(), 2, 10, rng);
        sampler.sample_from(1)
    }

    #[test]
    fn test_write_nodes_and_links() {
        let run = sample_run();
        let dir = tempdir().unwrap();

        write_nodes(&run, dir.path()).unwrap();
        write_links(&run, dir.path()).unwrap();

        let nodes = fs::read_to_string(dir.path().join("nodes")).unwrap();
        assert_eq!(nodes, "1\n2\n");

        let links = fs::read_to_string(dir.path().join("links")).unwrap();
        assert_eq!(links, "1 - 2\n");
    }

    #[test]
    fn test_core_list_path_locations() {
        let map_path = Path::new("/data/maps/baixpenedes.xml");
        let output_dir = Path::new("/tmp/out");

        let in_output = core_list_path(CoreListLocation::Output, map_path, output_dir);
        assert_eq!(in_output, PathBuf::from("/tmp/out/baixpenedes-corenodes.txt"));

        let by_map = core_list_path(CoreListLocation::Map, map_path, output_dir);
        assert_eq!(by_map, PathBuf::from("/data/maps/baixpenedes-corenodes.txt"));
    }

    #[test]
    fn test_write_core_nodes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("map-corenodes.txt");
        write_core_nodes(&[10, 20, 30], &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "10\n20\n30\n");
    }
}
