use cloudconfig::{parse_config, BootCommand, CloudConfig, Interface};
use serde_json::json;

#[test]
fn end_to_end_scenario_serializes_canonically() {
    let input = r#"{"hostname":"node1","ssh_authorized_keys":["ssh-rsa AAAA..."],"write_files":[{"path":"/etc/hosts","permissions":"0644","owner":"root","content":"127.0.0.1 node1","append":false}]}"#;
    let config = parse_config(input).unwrap();
    assert_eq!(config.hostname.as_deref(), Some("node1"));

    let output = config.to_canonical_json().unwrap();

    // Top-level keys come out sorted regardless of input order.
    let positions: Vec<usize> = ["\"hostname\"", "\"rancher\"", "\"ssh_authorized_keys\"", "\"write_files\""]
        .iter()
        .map(|key| output.find(key).unwrap())
        .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));

    // Entry keys sort too, and permissions survive as a string.
    let entry_positions: Vec<usize> = ["\"append\"", "\"content\"", "\"owner\"", "\"path\"", "\"permissions\""]
        .iter()
        .map(|key| output.find(key).unwrap())
        .collect();
    assert!(entry_positions.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(output.contains("\"permissions\": \"0644\""));
    assert!(output.contains("\"path\": \"/etc/hosts\""));
    assert!(output.contains("\"owner\": \"root\""));
}

#[test]
fn round_trip_preserves_a_minimal_document() {
    let config = parse_config("{}").unwrap();
    let output = config.to_canonical_json().unwrap();

    // Unset optionals are omitted; explicit default instances are emitted.
    assert!(!output.contains("\"hostname\""));
    assert!(!output.contains("\"write_files\""));
    assert!(!output.contains("\"docker\""));
    assert!(output.contains("\"dns\""));
    assert!(output.contains("\"TZ\": \"Europe/Moscow\""));
    assert!(output.contains("\"boot_dev\": \"LABEL=RANCHER_BOOT\""));

    let reparsed = parse_config(&output).unwrap();
    assert_eq!(config, reparsed);
}

#[test]
fn round_trip_preserves_a_fully_populated_document() {
    let document = json!({
        "hostname": "node3",
        "ssh_authorized_keys": ["ssh-rsa AAAA...", "ssh-ed25519 BBBB..."],
        "rancher": {
            "ssh": {"daemon": false, "port": 2222},
            "preload_wait": false,
            "docker": {"engine": "docker-17.03.2"},
            "runcmd": ["sysctl -p", ["touch", "/run/ready"]],
            "environment": {"TZ": "UTC"},
            "services_include": {"open-vm-tools": true, "qemu-guest-agent": true},
            "state": {
                "autoformat": ["/dev/sda"],
                "dev": "label=rancher_data",
                "fstype": "ext4",
                "required": true
            },
            "network": {
                "dns": {"nameservers": ["1.1.1.1"]},
                "interfaces": {
                    "eth0": {"address": "10.0.0.5/24", "dhcp": false},
                    "wlan0": {"wifi_network": "home"}
                },
                "wifi_networks": {
                    "home": {"ssid": "home-net", "psk": "hunter2", "scan_ssid": 0}
                }
            }
        },
        "write_files": [{
            "path": "/etc/hosts",
            "permissions": "0644",
            "owner": "rancher",
            "content": "127.0.0.1 node3",
            "append": true,
            "container": "console"
        }]
    });
    let config = CloudConfig::from_value(&document).unwrap();
    let output = config.to_canonical_json().unwrap();
    let reparsed = parse_config(&output).unwrap();
    assert_eq!(config, reparsed);

    assert_eq!(
        config.rancher.runcmd,
        vec![
            BootCommand::Shell("sysctl -p".to_string()),
            BootCommand::Exec(vec!["touch".to_string(), "/run/ready".to_string()]),
        ]
    );
    let interfaces = config.rancher.network.interfaces.as_ref().unwrap();
    assert!(matches!(interfaces["wlan0"], Interface::Wireless(_)));
    assert!(matches!(interfaces["eth0"], Interface::Wired(_)));
}

#[test]
fn services_include_round_trips_hyphenated_keys_exactly() {
    let input = r#"{"rancher": {"services_include": {"open-vm-tools": true, "kernel-headers-system-docker": true}}}"#;
    let config = parse_config(input).unwrap();
    let output = config.to_canonical_json().unwrap();

    assert!(output.contains("\"open-vm-tools\": true"));
    assert!(output.contains("\"kernel-headers-system-docker\": true"));
    assert!(output.contains("\"hyperv-vm-tools\": false"));
    assert!(!output.contains("open_vm_tools"));

    let reparsed = parse_config(&output).unwrap();
    assert_eq!(config, reparsed);
}

#[test]
fn yaml_document_validates_like_its_json_form() {
    let yaml = r#"#cloud-config
hostname: node4
rancher:
  ssh:
    port: 2222
  state:
    dev: label=rancher_state
    autoformat:
      - /dev/sda
      - /dev/vdb
write_files:
  - path: /etc/motd
    content: welcome
    append: false
"#;
    let config = parse_config(yaml).unwrap();
    assert_eq!(config.hostname.as_deref(), Some("node4"));
    assert_eq!(config.rancher.ssh.port, 2222);
    assert_eq!(config.rancher.state.dev, "LABEL=RANCHER_STATE");
    assert_eq!(config.rancher.state.autoformat.len(), 2);
    let files = config.write_files.unwrap();
    assert_eq!(files[0].permissions, "0400");
    assert!(!files[0].append);
}

#[test]
fn one_pass_reports_every_violation() {
    let result = parse_config(
        r#"{"junk": 1, "rancher": {"ssh": {"port": 0}}, "write_files": [{"permissions": "12345", "append": false}]}"#,
    );
    let err = match result {
        Err(cloudconfig::Error::Validation(errors)) => errors,
        other => panic!("expected validation errors, got {other:?}"),
    };
    assert_eq!(err.len(), 3);
    let rendered = err.to_string();
    assert!(rendered.contains("junk: unknown field"));
    assert!(rendered.contains("rancher.ssh.port"));
    assert!(rendered.contains("write_files[0].permissions"));
}
