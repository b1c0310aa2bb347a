#[cfg(test)]
mod sampler_regression_tests {
    use std::fs;
    use std::io::Write;
    use std::path::{Path, PathBuf};

    use tempfile::{tempdir, TempDir};

    use topgen::cnml::NetworkMap;
    use topgen::config::{Config, CoreListLocation, Protocol};
    use topgen::orchestrator;

    /// CNML text for a zone holding a full mesh over the given core node ids
    fn mesh_cnml(ids: &[u32]) -> String {
        let mut doc = String::from("<?xml version=\"1.0\"?>\n<cnml>\n");
        doc.push_str(&format!(
            "<zone id=\"1\" title=\"MeshZone\" zone_nodes=\"{}\">\n",
            ids.len()
        ));
        for &id in ids {
            doc.push_str(&format!(
                "<node id=\"{}\" status=\"Working\" links=\"{}\">\n",
                id,
                ids.len() - 1
            ));
            doc.push_str("<device id=\"900\">\n");
            doc.push_str(&format!(
                "<interface id=\"{}\" ipv4=\"172.16.0.{}\">\n",
                id * 10,
                id
            ));
            for &peer in ids {
                if peer != id {
                    doc.push_str(&format!(
                        "<link id=\"{}\" linked_node_id=\"{}\" linked_interface_id=\"{}\"/>\n",
                        id * 100 + peer,
                        peer,
                        peer * 10
                    ));
                }
            }
            doc.push_str("</interface>\n</device>\n</node>\n");
        }
        doc.push_str("</zone>\n</cnml>\n");
        doc
    }

    /// Write a map into a temp directory and return (dir, map path)
    fn write_map(content: &str) -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("testmap.xml");
        let mut file = fs::File::create(&path).unwrap();
        write!(file, "{}", content).unwrap();
        (dir, path)
    }

    fn test_config(output_dir: &Path, max_nodes: usize) -> Config {
        let mut config = Config::default();
        config.general.output_dir = output_dir.display().to_string();
        config.sampling.core_subnet = "172.0.0.0/8".to_string();
        config.sampling.max_nodes = max_nodes;
        config.sampling.seed = Some(42);
        config
    }

    #[test]
    fn test_end_to_end_success_writes_all_outputs() {
        let (_map_dir, map_path) = write_map(&mesh_cnml(&[1, 2, 3, 4, 5]));
        let map = NetworkMap::load(&map_path).unwrap();

        let out = tempdir().unwrap();
        let mut config = test_config(out.path(), 3);
        config.output.protocol = Protocol::Bmx6;

        let run_dir = orchestrator::generate_topology(&map, &map_path, &config)
            .unwrap()
            .expect("successful run must produce a run directory");

        // Node listing has exactly the target number of entries
        let nodes_content = fs::read_to_string(run_dir.join("nodes")).unwrap();
        let nodes: Vec<u32> = nodes_content
            .lines()
            .map(|l| l.parse().unwrap())
            .collect();
        assert_eq!(nodes.len(), 3);

        // Links reference sampled nodes only, normalized and unique
        let links_content = fs::read_to_string(run_dir.join("links")).unwrap();
        let mut seen = Vec::new();
        for line in links_content.lines() {
            let parts: Vec<u32> = line.split(" - ").map(|p| p.parse().unwrap()).collect();
            assert_eq!(parts.len(), 2);
            assert!(parts[0] < parts[1]);
            assert!(nodes.contains(&parts[0]));
            assert!(nodes.contains(&parts[1]));
            assert!(!seen.contains(&(parts[0], parts[1])));
            seen.push((parts[0], parts[1]));
        }
        // Three mesh nodes stay fully interconnected
        assert_eq!(seen.len(), 3);

        // Run report agrees with the listings
        let report: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(run_dir.join("topology.json")).unwrap())
                .unwrap();
        assert_eq!(report["success"], true);
        assert_eq!(report["actual_size"], 3);

        // Heavy outputs exist for a successful run
        assert!(run_dir.join("graph.dot").is_file());
        let exp_dirs: Vec<PathBuf> = fs::read_dir(&run_dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.is_dir())
            .collect();
        assert_eq!(exp_dirs.len(), 1);
        let exp_name = exp_dirs[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(exp_name.starts_with("VirtualBMX6BigLan-"));
        assert!(exp_name.ends_with("-3"));
        assert!(fs::read_dir(&exp_dirs[0])
            .unwrap()
            .any(|e| e.unwrap().path().extension().map_or(false, |ext| ext == "ns")));

        // Core candidate listing sits in the output base by default
        assert!(out.path().join("testmap-corenodes.txt").is_file());
    }

    #[test]
    fn test_undersized_run_is_suppressed_by_default() {
        // A single core node can never satisfy a target of two
        let (_map_dir, map_path) = write_map(&mesh_cnml(&[1]));
        let map = NetworkMap::load(&map_path).unwrap();

        let out = tempdir().unwrap();
        let config = test_config(out.path(), 2);

        let result = orchestrator::generate_topology(&map, &map_path, &config).unwrap();
        assert!(result.is_none());

        // Only the pre-walk core listing was written, no run directory
        let entries: Vec<PathBuf> = fs::read_dir(out.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(entries, vec![out.path().join("testmap-corenodes.txt")]);
    }

    #[test]
    fn test_undersized_run_writes_listings_when_configured() {
        let (_map_dir, map_path) = write_map(&mesh_cnml(&[1]));
        let map = NetworkMap::load(&map_path).unwrap();

        let out = tempdir().unwrap();
        let mut config = test_config(out.path(), 2);
        config.output.emit_only_on_exact_match = false;
        config.output.protocol = Protocol::Olsrd;

        let run_dir = orchestrator::generate_topology(&map, &map_path, &config)
            .unwrap()
            .expect("listings are still written for undersized runs");

        assert_eq!(fs::read_to_string(run_dir.join("nodes")).unwrap(), "1\n");
        assert_eq!(fs::read_to_string(run_dir.join("links")).unwrap(), "");

        let report: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(run_dir.join("topology.json")).unwrap())
                .unwrap();
        assert_eq!(report["success"], false);
        assert_eq!(report["actual_size"], 1);
        assert_eq!(report["target_size"], 2);

        // No heavy outputs for a failed run
        assert!(!run_dir.join("graph.dot").exists());
        assert!(fs::read_dir(&run_dir)
            .unwrap()
            .all(|e| e.unwrap().path().is_file()));
    }

    #[test]
    fn test_map_without_core_nodes_is_an_error() {
        let cnml = r#"
            <cnml>
                <zone id="1" title="Edge" zone_nodes="2">
                    <node id="1" status="Working" links="2">
                        <interface id="11" ipv4="10.228.0.1"/>
                    </node>
                    <node id="2" status="Working" links="2">
                        <interface id="21" ipv4="192.168.5.1"/>
                    </node>
                </zone>
            </cnml>
        "#;
        let (_map_dir, map_path) = write_map(cnml);
        let map = NetworkMap::load(&map_path).unwrap();

        let out = tempdir().unwrap();
        let config = test_config(out.path(), 2);

        assert!(orchestrator::generate_topology(&map, &map_path, &config).is_err());
    }

    #[test]
    fn test_core_listing_next_to_map() {
        let (map_dir, map_path) = write_map(&mesh_cnml(&[1, 2, 3]));
        let map = NetworkMap::load(&map_path).unwrap();

        let out = tempdir().unwrap();
        let mut config = test_config(out.path(), 3);
        config.output.core_list_location = CoreListLocation::Map;

        orchestrator::generate_topology(&map, &map_path, &config)
            .unwrap()
            .unwrap();

        let listing = map_dir.path().join("testmap-corenodes.txt");
        assert_eq!(fs::read_to_string(listing).unwrap(), "1\n2\n3\n");
        assert!(!out.path().join("testmap-corenodes.txt").exists());
    }

    #[test]
    fn test_same_seed_reproduces_the_same_topology() {
        let (_map_dir, map_path) = write_map(&mesh_cnml(&[1, 2, 3, 4, 5, 6]));
        let map = NetworkMap::load(&map_path).unwrap();

        let mut node_lists = Vec::new();
        for _ in 0..2 {
            let out = tempdir().unwrap();
            let config = test_config(out.path(), 4);
            let run_dir = orchestrator::generate_topology(&map, &map_path, &config)
                .unwrap()
                .unwrap();
            node_lists.push(fs::read_to_string(run_dir.join("nodes")).unwrap());
        }
        assert_eq!(node_lists[0], node_lists[1]);
    }

    #[test]
    fn test_summary_runs_on_a_parsed_map() {
        let (_map_dir, map_path) = write_map(&mesh_cnml(&[1, 2, 3]));
        let map = NetworkMap::load(&map_path).unwrap();
        let out = tempdir().unwrap();
        let config = test_config(out.path(), 3);
        orchestrator::print_summary(&map, &config).unwrap();
    }
}
