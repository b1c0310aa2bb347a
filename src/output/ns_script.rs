//! Emulab NS experiment script generation.
//!
//! For a successfully sampled topology this produces the `.ns` file the
//! testbed consumes: one virtual node per sampled node, a monitor host
//! driving the experiment phases through program-agent event groups, and a
//! shared big LAN. The two supported routing daemons differ in their
//! tarball, helper-script location, and event schedule.

use std::fs;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};
use log::info;

use crate::config::Protocol;
use crate::sampler::SampleRun;

struct ProtocolTemplate {
    label: &'static str,
    tarball: &'static str,
    script_dir: &'static str,
    install_script: &'static str,
    start_script: &'static str,
    /// OLSRd needs an extra phase assigning IPv6 addresses before they are
    /// written out
    sets_ipv6: bool,
    schedule: Vec<(u32, String)>,
}

fn template_for(protocol: Protocol) -> Option<ProtocolTemplate> {
    match protocol {
        Protocol::Bmx6 => Some(ProtocolTemplate {
            label: "BMX6",
            tarball: "/proj/CONFINE/tarfiles/bmx6.tar.gz",
            script_dir: "/proj/CONFINE/runme-BMX6/virtual",
            install_script: "install_BMX6.sh",
            start_script: "start_BMX6.sh",
            sets_ipv6: false,
            schedule: vec![
                (30, "monitorSetupEnv".to_string()),
                (40, "monitorSetRouter".to_string()),
                (50, "nodeGroupInstall".to_string()),
                (55, "nodeGroupInstallBMX6".to_string()),
                (180, "nodeGroupWriteIPv6".to_string()),
                (230, "monitorFailPass".to_string()),
                (240, "nodeGroupFilter".to_string()),
                (290, "nodeGroupRouteCheck".to_string()),
                (300, "monitorStartTcpdump".to_string()),
                (318, "monitorIntervalLog".to_string()),
                (320, "nodeGroupBMX6".to_string()),
                (500, "monitorStopTcpdump".to_string()),
            ],
        }),
        Protocol::Olsrd => Some(ProtocolTemplate {
            label: "OLSRd",
            tarball: "/proj/CONFINE/tarfiles/olsrd-0.6.5.2.tar.gz",
            script_dir: "/proj/CONFINE/runme-OLSR/virtual",
            install_script: "install_OLSR.sh",
            start_script: "start_OLSR.sh",
            sets_ipv6: true,
            schedule: vec![
                (30, "monitorSetupEnv".to_string()),
                (40, "monitorSetRouter".to_string()),
                (50, "nodeGroupInstall".to_string()),
                (55, "nodeGroupInstallOLSRd".to_string()),
                (180, "nodeGroupSetIPv6".to_string()),
                (220, "nodeGroupWriteIPv6".to_string()),
                (260, "monitorFailPass".to_string()),
                (280, "nodeGroupFilter".to_string()),
                (310, "nodeGroupRouteCheck".to_string()),
                (320, "monitorStartTcpdump".to_string()),
                (338, "monitorIntervalLog".to_string()),
                (340, "nodeGroupOLSRd".to_string()),
                (540, "monitorStopTcpdump".to_string()),
            ],
        }),
        Protocol::None => None,
    }
}

/// Generate the experiment directory for a sampled topology: per-node
/// traffic filter files plus the NS script itself. Returns the script path,
/// or `None` when no protocol is configured.
pub fn generate_experiment(
    run: &SampleRun,
    protocol: Protocol,
    run_dir: &Path,
) -> Result<Option<PathBuf>> {
    let template = match template_for(protocol) {
        Some(template) => template,
        None => return Ok(None),
    };

    let exp_name = format!(
        "Virtual{}BigLan-{}-{}",
        template.label,
        run.start_node(),
        run.target_size()
    );
    let exp_dir = run_dir.join(&exp_name);
    fs::create_dir_all(&exp_dir)
        .wrap_err_with(|| format!("Failed to create experiment directory '{}'", exp_dir.display()))?;

    write_filter_files(run, &exp_dir)?;

    let script = render_script(run, &template);
    let path = exp_dir.join(format!("{}.ns", exp_name));
    fs::write(&path, script)
        .wrap_err_with(|| format!("Failed to write experiment script '{}'", path.display()))?;
    info!("Generated {} experiment script: {}", template.label, path.display());
    Ok(Some(path))
}

/// Each node gets a filter file naming its sampled link partners, consumed
/// by the ip6tables filter script to emulate the sampled link structure on
/// the shared LAN
fn write_filter_files(run: &SampleRun, exp_dir: &Path) -> Result<()> {
    for node in run.sampled_nodes() {
        let mut content = String::new();
        for partner in run.link_partners(node) {
            content.push_str(&format!("node{}\n", partner));
        }
        let path = exp_dir.join(format!("node{}.filter", node));
        fs::write(&path, content)
            .wrap_err_with(|| format!("Failed to write filter file '{}'", path.display()))?;
    }
    Ok(())
}

fn render_script(run: &SampleRun, template: &ProtocolTemplate) -> String {
    let dir = template.script_dir;
    let label = template.label;
    let node_count = run.actual_size();

    // Program agents installed on every virtual node: (name prefix, command,
    // event group), in experiment phase order
    let mut node_agents: Vec<(String, String, String)> = vec![
        (
            "progInstall".to_string(),
            format!("sudo {}/install_ip6tables.sh", dir),
            "nodeGroupInstall".to_string(),
        ),
        (
            format!("progInstall{}", label),
            format!("{}/{}", dir, template.install_script),
            format!("nodeGroupInstall{}", label),
        ),
    ];
    if template.sets_ipv6 {
        node_agents.push((
            "progSetIPv6".to_string(),
            format!("{}/setIPv6.sh", dir),
            "nodeGroupSetIPv6".to_string(),
        ));
    }
    node_agents.push((
        "progWriteIPv6".to_string(),
        format!("{}/ipv6tofile.sh", dir),
        "nodeGroupWriteIPv6".to_string(),
    ));
    node_agents.push((
        "progFilter".to_string(),
        format!("{}/filter_ip6tables.sh", dir),
        "nodeGroupFilter".to_string(),
    ));
    node_agents.push((
        "progRouteCheck".to_string(),
        format!("{}/routeCheck.sh", dir),
        "nodeGroupRouteCheck".to_string(),
    ));
    node_agents.push((
        format!("prog{}", label),
        format!("{}/{}", dir, template.start_script),
        format!("nodeGroup{}", label),
    ));

    let monitor_agents: Vec<(String, String, String)> = vec![
        (
            "progSetupEnv".to_string(),
            format!("{}/setup_exp_env.sh", dir),
            "monitorSetupEnv".to_string(),
        ),
        (
            "progSetRouter".to_string(),
            format!("sudo {}/setRouter.sh", dir),
            "monitorSetRouter".to_string(),
        ),
        (
            "progFailPass".to_string(),
            format!("sudo {}/failpass.sh {}", dir, node_count),
            "monitorFailPass".to_string(),
        ),
        (
            "progStartTcpdump".to_string(),
            format!("{}/start_tcpdump.sh", dir),
            "monitorStartTcpdump".to_string(),
        ),
        (
            "progIntervalLog".to_string(),
            format!("{}/start_interval_logging.sh", dir),
            "monitorIntervalLog".to_string(),
        ),
        (
            "progStopTcpdump".to_string(),
            format!("{}/stop_tcpdump.sh", dir),
            "monitorStopTcpdump".to_string(),
        ),
    ];

    let mut ns = String::new();
    ns.push_str("set ns [new Simulator]\n");
    ns.push_str("source tb_compat.tcl\n\n");

    // Event group declarations
    for (_, _, group) in &node_agents {
        ns.push_str(&format!("set {} [$ns event-group]\n", group));
    }
    ns.push('\n');
    for (_, _, group) in &monitor_agents {
        ns.push_str(&format!("set {} [$ns event-group]\n", group));
    }
    ns.push('\n');

    // Virtual nodes with their program agents
    for node in run.sampled_nodes() {
        ns.push_str(&format!("set node{} [$ns node]\n", node));
        ns.push_str(&format!(
            "tb-set-node-tarfiles $node{} /usr/local/src/ {}\n",
            node, template.tarball
        ));
        ns.push_str(&format!("append lanstr \"$node{} \"\n", node));
        for (prog, command, _) in &node_agents {
            ns.push_str(&format!(
                "set {}{} [$node{} program-agent -command \"{}\"]\n",
                prog, node, node, command
            ));
        }
        for (prog, _, group) in &node_agents {
            ns.push_str(&format!("${} add ${}{}\n", group, prog, node));
        }
        ns.push('\n');
    }

    for node in run.sampled_nodes() {
        ns.push_str(&format!("tb-set-hardware $node{} pcvm\n", node));
        ns.push_str(&format!("tb-set-node-os $node{} OPENVZ-STD\n", node));
    }
    ns.push('\n');

    // Monitor host coordinating the experiment phases
    ns.push_str("set nodeMonitor [$ns node]\n");
    ns.push_str("tb-set-hardware $nodeMonitor pcvm\n");
    ns.push_str("tb-set-node-os $nodeMonitor OPENVZ-STD\n");
    for (prog, command, _) in &monitor_agents {
        ns.push_str(&format!(
            "set {} [$nodeMonitor program-agent -command \"{}\"]\n",
            prog, command
        ));
    }
    for (prog, _, group) in &monitor_agents {
        ns.push_str(&format!("${} add ${}\n", group, prog));
    }
    ns.push_str("append lanstr \"$nodeMonitor \"\n\n");

    ns.push_str("set nodePhysical [$ns node]\n");
    ns.push_str("tb-set-node-os $nodePhysical UBUNTU12-64-STD\n");
    ns.push_str("append lanstr \"$nodePhysical \"\n\n");

    ns.push_str("set big-lan [$ns make-lan \"$lanstr\" 1000Mb 20ms]\n\n");

    for (time, group) in &template.schedule {
        ns.push_str(&format!("$ns at {} \"${} start\"\n", time, group));
    }
    ns.push('\n');
    ns.push_str("$ns run\n");
    ns
}
