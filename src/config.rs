//! The cloud-config entity tree.
//!
//! Every record is built from a parsed generic document via `from_value`.
//! Construction accumulates violations instead of stopping at the first
//! one, and the tree is only handed to the caller once it validated
//! cleanly. Serialization always goes through [`CloudConfig::to_canonical_json`],
//! which emits the deterministic form the provisioning agent consumes.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use ipnetwork::Ipv4Network;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{Error, ErrorKind, ValidationErrors};
use crate::fields::{self, Fields, Report};
use crate::types::{DiskDevice, DiskLabel, EngineVersion, FileMode, FsType, User};

/// Root cloud-config document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CloudConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub rancher: RancherConfig,
    pub ssh_authorized_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_files: Option<Vec<WriteFile>>,
}

impl CloudConfig {
    /// Validate a parsed document into the typed tree.
    ///
    /// The result is atomic: either every constraint holds and the full
    /// tree is returned, or the complete set of violations is returned and
    /// no document exists. Byte-stream parsing is the caller's job; see
    /// [`crate::parse_config`] for the textual convenience entry.
    pub fn from_value(value: &Value) -> Result<Self, ValidationErrors> {
        let mut report = Report::default();
        let mut config = CloudConfig::default();

        if let Some(map) = fields::object(value, "", &mut report) {
            let mut doc = Fields::new(map);

            if let Some(v) = doc.take("hostname") {
                config.hostname = fields::string(v, "hostname", &mut report);
            }
            if let Some(v) = doc.take("rancher") {
                config.rancher = RancherConfig::from_value(v, "rancher", &mut report);
            }
            if let Some(v) = doc.take("ssh_authorized_keys") {
                if let Some(list) = fields::array(v, "ssh_authorized_keys", &mut report) {
                    for (i, item) in list.iter().enumerate() {
                        let path = fields::element("ssh_authorized_keys", i);
                        if let Some(key) = fields::string(item, &path, &mut report) {
                            config.ssh_authorized_keys.push(key);
                        }
                    }
                }
            }
            if let Some(v) = doc.take("write_files") {
                if let Some(list) = fields::array(v, "write_files", &mut report) {
                    let mut entries = Vec::with_capacity(list.len());
                    for (i, item) in list.iter().enumerate() {
                        let path = fields::element("write_files", i);
                        entries.push(WriteFile::from_value(item, &path, &mut report));
                    }
                    config.write_files = Some(entries);
                }
            }

            doc.deny_unknown("", &mut report);
        }

        if !report.is_empty() {
            debug!("cloud-config rejected with {} violation(s)", report.len());
        }
        report.finish(config)
    }

    /// Serialize to the canonical byte form: keys sorted lexicographically
    /// at every level, two-space indentation, unset optionals omitted.
    ///
    /// Field declaration order never leaks into the output; the document is
    /// routed through a `Value` whose object map keeps keys sorted.
    pub fn to_canonical_json(&self) -> Result<String, Error> {
        trace!("serializing canonical cloud-config");
        let value = serde_json::to_value(self)?;
        Ok(serde_json::to_string_pretty(&value)?)
    }
}

/// The `rancher` block: agent, platform, and service settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RancherConfig {
    pub services_include: ServicesInclude,
    pub network: NetworkConfig,
    pub environment: Environment,
    pub runcmd: Vec<BootCommand>,
    pub ssh: SshConfig,
    pub state: StateConfig,
    pub preload_wait: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker: Option<DockerConfig>,
}

impl Default for RancherConfig {
    fn default() -> Self {
        Self {
            services_include: ServicesInclude::default(),
            network: NetworkConfig::default(),
            environment: Environment::default(),
            runcmd: Vec::new(),
            ssh: SshConfig::default(),
            state: StateConfig::default(),
            preload_wait: true,
            docker: None,
        }
    }
}

impl RancherConfig {
    fn from_value(value: &Value, path: &str, report: &mut Report) -> Self {
        let mut config = Self::default();
        let Some(map) = fields::object(value, path, report) else {
            return config;
        };
        let mut block = Fields::new(map);

        if let Some(v) = block.take("services_include") {
            let p = fields::child(path, "services_include");
            config.services_include = ServicesInclude::from_value(v, &p, report);
        }
        if let Some(v) = block.take("network") {
            let p = fields::child(path, "network");
            config.network = NetworkConfig::from_value(v, &p, report);
        }
        if let Some(v) = block.take("environment") {
            let p = fields::child(path, "environment");
            config.environment = Environment::from_value(v, &p, report);
        }
        if let Some(v) = block.take("runcmd") {
            let p = fields::child(path, "runcmd");
            if let Some(list) = fields::array(v, &p, report) {
                for (i, item) in list.iter().enumerate() {
                    if let Some(command) =
                        BootCommand::from_value(item, &fields::element(&p, i), report)
                    {
                        config.runcmd.push(command);
                    }
                }
            }
        }
        if let Some(v) = block.take("ssh") {
            let p = fields::child(path, "ssh");
            config.ssh = SshConfig::from_value(v, &p, report);
        }
        if let Some(v) = block.take("state") {
            let p = fields::child(path, "state");
            config.state = StateConfig::from_value(v, &p, report);
        }
        if let Some(v) = block.take("preload_wait") {
            let p = fields::child(path, "preload_wait");
            if let Some(b) = fields::boolean(v, &p, report) {
                config.preload_wait = b;
            }
        }
        if let Some(v) = block.take("docker") {
            let p = fields::child(path, "docker");
            config.docker = Some(DockerConfig::from_value(v, &p, report));
        }

        block.deny_unknown(path, report);
        config
    }
}

/// SSH daemon settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SshConfig {
    pub daemon: bool,
    pub port: u16,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            daemon: true,
            port: 22,
        }
    }
}

impl SshConfig {
    fn from_value(value: &Value, path: &str, report: &mut Report) -> Self {
        let mut config = Self::default();
        let Some(map) = fields::object(value, path, report) else {
            return config;
        };
        let mut block = Fields::new(map);

        if let Some(v) = block.take("daemon") {
            let p = fields::child(path, "daemon");
            if let Some(b) = fields::boolean(v, &p, report) {
                config.daemon = b;
            }
        }
        if let Some(v) = block.take("port") {
            let p = fields::child(path, "port");
            match fields::integer(v, &p, report) {
                Some(n) if (1..=i64::from(u16::MAX)).contains(&n) => config.port = n as u16,
                Some(_) => report.push(
                    p,
                    ErrorKind::TypeMismatch {
                        expected: "a positive port number",
                    },
                ),
                None => {}
            }
        }

        block.deny_unknown(path, report);
        config
    }
}

/// State-partition and disk setup consumed early in boot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateConfig {
    pub autoformat: Vec<DiskDevice>,
    pub boot_dev: DiskLabel,
    pub boot_fstype: FsType,
    pub cryptsetup: bool,
    pub dev: DiskLabel,
    pub directory: String,
    pub fstype: FsType,
    pub lvm_scan: bool,
    pub mdadm_scan: bool,
    pub oem_dev: DiskLabel,
    pub oem_fstype: FsType,
    pub required: bool,
    pub rngd: bool,
    pub script: String,
    pub wait: bool,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            autoformat: Vec::new(),
            boot_dev: DiskLabel::new("LABEL=RANCHER_BOOT").unwrap(),
            boot_fstype: FsType::Auto,
            cryptsetup: false,
            dev: DiskLabel::new("LABEL=RANCHER_STATE").unwrap(),
            directory: String::new(),
            fstype: FsType::Auto,
            lvm_scan: false,
            mdadm_scan: false,
            oem_dev: DiskLabel::new("LABEL=RANCHER_OEM").unwrap(),
            oem_fstype: FsType::Auto,
            required: false,
            rngd: true,
            script: String::new(),
            wait: true,
        }
    }
}

impl StateConfig {
    fn from_value(value: &Value, path: &str, report: &mut Report) -> Self {
        let mut config = Self::default();
        let Some(map) = fields::object(value, path, report) else {
            return config;
        };
        let mut block = Fields::new(map);

        if let Some(v) = block.take("autoformat") {
            let p = fields::child(path, "autoformat");
            if let Some(list) = fields::array(v, &p, report) {
                for (i, item) in list.iter().enumerate() {
                    let ep = fields::element(&p, i);
                    if let Some(raw) = fields::string(item, &ep, report) {
                        match DiskDevice::new(&raw) {
                            Ok(device) => config.autoformat.push(device),
                            Err(kind) => report.push(ep, kind),
                        }
                    }
                }
            }
        }
        if let Some(label) = label_field(&mut block, "boot_dev", path, report) {
            config.boot_dev = label;
        }
        if let Some(fstype) = fstype_field(&mut block, "boot_fstype", path, report) {
            config.boot_fstype = fstype;
        }
        if let Some(v) = block.take("cryptsetup") {
            let p = fields::child(path, "cryptsetup");
            if let Some(b) = fields::boolean(v, &p, report) {
                config.cryptsetup = b;
            }
        }
        if let Some(label) = label_field(&mut block, "dev", path, report) {
            config.dev = label;
        }
        if let Some(v) = block.take("directory") {
            let p = fields::child(path, "directory");
            if let Some(s) = fields::string(v, &p, report) {
                config.directory = s;
            }
        }
        if let Some(fstype) = fstype_field(&mut block, "fstype", path, report) {
            config.fstype = fstype;
        }
        if let Some(v) = block.take("lvm_scan") {
            let p = fields::child(path, "lvm_scan");
            if let Some(b) = fields::boolean(v, &p, report) {
                config.lvm_scan = b;
            }
        }
        if let Some(v) = block.take("mdadm_scan") {
            let p = fields::child(path, "mdadm_scan");
            if let Some(b) = fields::boolean(v, &p, report) {
                config.mdadm_scan = b;
            }
        }
        if let Some(label) = label_field(&mut block, "oem_dev", path, report) {
            config.oem_dev = label;
        }
        if let Some(fstype) = fstype_field(&mut block, "oem_fstype", path, report) {
            config.oem_fstype = fstype;
        }
        if let Some(v) = block.take("required") {
            let p = fields::child(path, "required");
            if let Some(b) = fields::boolean(v, &p, report) {
                config.required = b;
            }
        }
        if let Some(v) = block.take("rngd") {
            let p = fields::child(path, "rngd");
            if let Some(b) = fields::boolean(v, &p, report) {
                config.rngd = b;
            }
        }
        if let Some(v) = block.take("script") {
            let p = fields::child(path, "script");
            if let Some(s) = fields::string(v, &p, report) {
                config.script = s;
            }
        }
        if let Some(v) = block.take("wait") {
            let p = fields::child(path, "wait");
            if let Some(b) = fields::boolean(v, &p, report) {
                config.wait = b;
            }
        }

        block.deny_unknown(path, report);
        config
    }
}

fn label_field(
    block: &mut Fields<'_>,
    key: &'static str,
    path: &str,
    report: &mut Report,
) -> Option<DiskLabel> {
    let value = block.take(key)?;
    let p = fields::child(path, key);
    let raw = fields::string(value, &p, report)?;
    match DiskLabel::new(&raw) {
        Ok(label) => Some(label),
        Err(kind) => {
            report.push(p, kind);
            None
        }
    }
}

fn fstype_field(
    block: &mut Fields<'_>,
    key: &'static str,
    path: &str,
    report: &mut Report,
) -> Option<FsType> {
    let value = block.take(key)?;
    let p = fields::child(path, key);
    let raw = fields::string(value, &p, report)?;
    match FsType::parse(&raw) {
        Ok(fstype) => Some(fstype),
        Err(kind) => {
            report.push(p, kind);
            None
        }
    }
}

/// Optional add-on services toggled per document.
///
/// External keys are the hyphenated service names; the mapping to the field
/// identifiers below is fixed and exhaustive, and [`ServicesInclude::toggle_mut`]
/// is the single place it is declared for the parse direction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServicesInclude {
    #[serde(rename = "amazon-ecs-agent")]
    pub amazon_ecs_agent: bool,
    #[serde(rename = "amazon-metadata")]
    pub amazon_metadata: bool,
    #[serde(rename = "container-cron")]
    pub container_cron: bool,
    #[serde(rename = "docker-compose")]
    pub docker_compose: bool,
    #[serde(rename = "hyperv-vm-tools")]
    pub hyperv_vm_tools: bool,
    #[serde(rename = "kernel-extras")]
    pub kernel_extras: bool,
    #[serde(rename = "kernel-headers")]
    pub kernel_headers: bool,
    #[serde(rename = "kernel-headers-system-docker")]
    pub kernel_headers_system_docker: bool,
    #[serde(rename = "modem-manager")]
    pub modem_manager: bool,
    #[serde(rename = "open-vm-tools")]
    pub open_vm_tools: bool,
    #[serde(rename = "qemu-guest-agent")]
    pub qemu_guest_agent: bool,
    #[serde(rename = "virtualbox-tools")]
    pub virtualbox_tools: bool,
    #[serde(rename = "volume-cifs")]
    pub volume_cifs: bool,
    #[serde(rename = "volume-efs")]
    pub volume_efs: bool,
    #[serde(rename = "volume-nfs")]
    pub volume_nfs: bool,
    pub waagent: bool,
    pub zfs: bool,
}

impl ServicesInclude {
    /// The declared toggle slot for an external key, if any.
    fn toggle_mut(&mut self, key: &str) -> Option<&mut bool> {
        Some(match key {
            "amazon-ecs-agent" => &mut self.amazon_ecs_agent,
            "amazon-metadata" => &mut self.amazon_metadata,
            "container-cron" => &mut self.container_cron,
            "docker-compose" => &mut self.docker_compose,
            "hyperv-vm-tools" => &mut self.hyperv_vm_tools,
            "kernel-extras" => &mut self.kernel_extras,
            "kernel-headers" => &mut self.kernel_headers,
            "kernel-headers-system-docker" => &mut self.kernel_headers_system_docker,
            "modem-manager" => &mut self.modem_manager,
            "open-vm-tools" => &mut self.open_vm_tools,
            "qemu-guest-agent" => &mut self.qemu_guest_agent,
            "virtualbox-tools" => &mut self.virtualbox_tools,
            "volume-cifs" => &mut self.volume_cifs,
            "volume-efs" => &mut self.volume_efs,
            "volume-nfs" => &mut self.volume_nfs,
            "waagent" => &mut self.waagent,
            "zfs" => &mut self.zfs,
            _ => return None,
        })
    }

    fn from_value(value: &Value, path: &str, report: &mut Report) -> Self {
        let mut config = Self::default();
        let Some(map) = fields::object(value, path, report) else {
            return config;
        };
        for (key, v) in map {
            let p = fields::child(path, key);
            match config.toggle_mut(key) {
                Some(slot) => {
                    if let Some(b) = fields::boolean(v, &p, report) {
                        *slot = b;
                    }
                }
                None => report.push(p, ErrorKind::UnknownField),
            }
        }
        config
    }
}

/// Network block: DNS plus optional interface and Wi-Fi credential maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkConfig {
    pub dns: DnsConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interfaces: Option<BTreeMap<String, Interface>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wifi_networks: Option<BTreeMap<String, WifiNetwork>>,
}

impl NetworkConfig {
    fn from_value(value: &Value, path: &str, report: &mut Report) -> Self {
        let mut config = Self::default();
        let Some(map) = fields::object(value, path, report) else {
            return config;
        };
        let mut block = Fields::new(map);

        if let Some(v) = block.take("dns") {
            let p = fields::child(path, "dns");
            config.dns = DnsConfig::from_value(v, &p, report);
        }
        if let Some(v) = block.take("interfaces") {
            let p = fields::child(path, "interfaces");
            if let Some(entries) = fields::object(v, &p, report) {
                let mut interfaces = BTreeMap::new();
                for (name, item) in entries {
                    let ep = fields::child(&p, name);
                    if let Some(interface) = Interface::from_value(item, &ep, report) {
                        interfaces.insert(name.clone(), interface);
                    }
                }
                config.interfaces = Some(interfaces);
            }
        }
        if let Some(v) = block.take("wifi_networks") {
            let p = fields::child(path, "wifi_networks");
            if let Some(entries) = fields::object(v, &p, report) {
                let mut networks = BTreeMap::new();
                for (name, item) in entries {
                    let ep = fields::child(&p, name);
                    networks.insert(name.clone(), WifiNetwork::from_value(item, &ep, report));
                }
                config.wifi_networks = Some(networks);
            }
        }

        block.deny_unknown(path, report);
        config
    }
}

/// DNS resolver settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DnsConfig {
    pub nameservers: Vec<Ipv4Addr>,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            nameservers: vec![Ipv4Addr::new(8, 8, 8, 8), Ipv4Addr::new(8, 8, 4, 4)],
        }
    }
}

impl DnsConfig {
    fn from_value(value: &Value, path: &str, report: &mut Report) -> Self {
        let mut config = Self::default();
        let Some(map) = fields::object(value, path, report) else {
            return config;
        };
        let mut block = Fields::new(map);

        if let Some(v) = block.take("nameservers") {
            let p = fields::child(path, "nameservers");
            if let Some(list) = fields::array(v, &p, report) {
                let mut servers = Vec::with_capacity(list.len());
                for (i, item) in list.iter().enumerate() {
                    let ep = fields::element(&p, i);
                    if let Some(raw) = fields::string(item, &ep, report) {
                        match raw.parse::<Ipv4Addr>() {
                            Ok(address) => servers.push(address),
                            Err(_) => report.push(
                                ep,
                                ErrorKind::TypeMismatch {
                                    expected: "IPv4 address",
                                },
                            ),
                        }
                    }
                }
                config.nameservers = servers;
            }
        }

        block.deny_unknown(path, report);
        config
    }
}

/// A configured network interface.
///
/// The variant is chosen structurally: the presence of `wifi_network` marks
/// the wireless shape, which is tried first; any other object validates
/// against the wired shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Interface {
    Wireless(WirelessInterface),
    Wired(WiredInterface),
}

impl Interface {
    fn from_value(value: &Value, path: &str, report: &mut Report) -> Option<Self> {
        let map = match value {
            Value::Object(map) => map,
            _ => {
                report.push(
                    path.to_string(),
                    ErrorKind::TypeMismatch {
                        expected: "wired or wireless interface object",
                    },
                );
                return None;
            }
        };

        if map.contains_key("wifi_network") {
            Some(Interface::Wireless(WirelessInterface::from_map(
                map, path, report,
            )))
        } else {
            Some(Interface::Wired(WiredInterface::from_map(map, path, report)))
        }
    }
}

/// Wired interface shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WiredInterface {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Ipv4Network>,
    pub dhcp: bool,
}

impl Default for WiredInterface {
    fn default() -> Self {
        Self {
            address: None,
            dhcp: true,
        }
    }
}

impl WiredInterface {
    fn from_map(
        map: &serde_json::Map<String, Value>,
        path: &str,
        report: &mut Report,
    ) -> Self {
        let mut interface = Self::default();
        let mut block = Fields::new(map);

        interface.address = address_field(&mut block, path, report);
        if let Some(v) = block.take("dhcp") {
            let p = fields::child(path, "dhcp");
            if let Some(b) = fields::boolean(v, &p, report) {
                interface.dhcp = b;
            }
        }

        block.deny_unknown(path, report);
        interface
    }
}

/// Wireless interface shape; `wifi_network` names an entry in the
/// document's `wifi_networks` map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WirelessInterface {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Ipv4Network>,
    pub dhcp: bool,
    pub wifi_network: String,
}

impl WirelessInterface {
    fn from_map(
        map: &serde_json::Map<String, Value>,
        path: &str,
        report: &mut Report,
    ) -> Self {
        let mut interface = Self {
            address: None,
            dhcp: true,
            wifi_network: String::new(),
        };
        let mut block = Fields::new(map);

        interface.address = address_field(&mut block, path, report);
        if let Some(v) = block.take("dhcp") {
            let p = fields::child(path, "dhcp");
            if let Some(b) = fields::boolean(v, &p, report) {
                interface.dhcp = b;
            }
        }
        if let Some(v) = block.take("wifi_network") {
            let p = fields::child(path, "wifi_network");
            if let Some(name) = fields::string(v, &p, report) {
                if name.is_empty() {
                    report.push(
                        p,
                        ErrorKind::TypeMismatch {
                            expected: "non-empty network name",
                        },
                    );
                } else {
                    interface.wifi_network = name;
                }
            }
        }

        block.deny_unknown(path, report);
        interface
    }
}

fn address_field(
    block: &mut Fields<'_>,
    path: &str,
    report: &mut Report,
) -> Option<Ipv4Network> {
    let value = block.take("address")?;
    let p = fields::child(path, "address");
    let raw = fields::string(value, &p, report)?;
    match raw.parse::<Ipv4Network>() {
        Ok(network) => Some(network),
        Err(_) => {
            report.push(
                p,
                ErrorKind::TypeMismatch {
                    expected: "IPv4 interface address",
                },
            );
            None
        }
    }
}

/// Credentials for one Wi-Fi network, keyed by network name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WifiNetwork {
    pub psk: String,
    pub scan_ssid: i64,
    pub ssid: String,
}

impl WifiNetwork {
    fn from_value(value: &Value, path: &str, report: &mut Report) -> Self {
        let mut network = Self {
            psk: String::new(),
            scan_ssid: 1,
            ssid: String::new(),
        };
        let Some(map) = fields::object(value, path, report) else {
            return network;
        };
        let mut block = Fields::new(map);

        match block.take("ssid") {
            Some(v) => {
                let p = fields::child(path, "ssid");
                if let Some(s) = fields::string(v, &p, report) {
                    network.ssid = s;
                }
            }
            None => report.push(fields::child(path, "ssid"), ErrorKind::RequiredFieldMissing),
        }
        match block.take("psk") {
            Some(v) => {
                let p = fields::child(path, "psk");
                if let Some(s) = fields::string(v, &p, report) {
                    network.psk = s;
                }
            }
            None => report.push(fields::child(path, "psk"), ErrorKind::RequiredFieldMissing),
        }
        if let Some(v) = block.take("scan_ssid") {
            let p = fields::child(path, "scan_ssid");
            if let Some(n) = fields::integer(v, &p, report) {
                network.scan_ssid = n;
            }
        }

        block.deny_unknown(path, report);
        network
    }
}

/// Environment variables exported to the agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Environment {
    #[serde(rename = "TZ")]
    pub tz: String,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            tz: "Europe/Moscow".to_string(),
        }
    }
}

impl Environment {
    fn from_value(value: &Value, path: &str, report: &mut Report) -> Self {
        let mut config = Self::default();
        let Some(map) = fields::object(value, path, report) else {
            return config;
        };
        let mut block = Fields::new(map);

        if let Some(v) = block.take("TZ") {
            let p = fields::child(path, "TZ");
            if let Some(tz) = fields::string(v, &p, report) {
                config.tz = tz;
            }
        }

        block.deny_unknown(path, report);
        config
    }
}

/// Docker engine selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DockerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineVersion>,
}

impl DockerConfig {
    fn from_value(value: &Value, path: &str, report: &mut Report) -> Self {
        let mut config = Self::default();
        let Some(map) = fields::object(value, path, report) else {
            return config;
        };
        let mut block = Fields::new(map);

        if let Some(v) = block.take("engine") {
            let p = fields::child(path, "engine");
            if let Some(raw) = fields::string(v, &p, report) {
                match EngineVersion::new(&raw) {
                    Ok(version) => config.engine = Some(version),
                    Err(kind) => report.push(p, kind),
                }
            }
        }

        block.deny_unknown(path, report);
        config
    }
}

/// One boot command: a shell line or an argv vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BootCommand {
    Shell(String),
    Exec(Vec<String>),
}

impl BootCommand {
    fn from_value(value: &Value, path: &str, report: &mut Report) -> Option<Self> {
        match value {
            Value::String(line) => Some(Self::Shell(line.trim().to_string())),
            Value::Array(items) => {
                let mut argv = Vec::with_capacity(items.len());
                let mut complete = true;
                for (i, item) in items.iter().enumerate() {
                    match fields::string(item, &fields::element(path, i), report) {
                        Some(arg) => argv.push(arg),
                        None => complete = false,
                    }
                }
                complete.then_some(Self::Exec(argv))
            }
            _ => {
                report.push(
                    path.to_string(),
                    ErrorKind::TypeMismatch {
                        expected: "shell line or argument list",
                    },
                );
                None
            }
        }
    }
}

/// One file to materialize on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteFile {
    #[serde(serialize_with = "forward_slash_path")]
    pub path: PathBuf,
    pub permissions: FileMode,
    pub owner: User,
    pub content: String,
    pub append: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
}

impl WriteFile {
    fn from_value(value: &Value, path: &str, report: &mut Report) -> Self {
        let mut entry = Self {
            path: PathBuf::from("/tmp"),
            permissions: FileMode::default(),
            owner: User::Root,
            content: String::new(),
            append: false,
            container: None,
        };
        let Some(map) = fields::object(value, path, report) else {
            return entry;
        };
        let mut block = Fields::new(map);

        if let Some(v) = block.take("path") {
            let p = fields::child(path, "path");
            if let Some(s) = fields::string(v, &p, report) {
                entry.path = PathBuf::from(s);
            }
        }
        if let Some(v) = block.take("permissions") {
            let p = fields::child(path, "permissions");
            if let Some(raw) = fields::string(v, &p, report) {
                match FileMode::new(&raw) {
                    Ok(mode) => entry.permissions = mode,
                    Err(kind) => report.push(p, kind),
                }
            }
        }
        if let Some(v) = block.take("owner") {
            let p = fields::child(path, "owner");
            if let Some(raw) = fields::string(v, &p, report) {
                match User::parse(&raw) {
                    Ok(owner) => entry.owner = owner,
                    Err(kind) => report.push(p, kind),
                }
            }
        }
        if let Some(v) = block.take("content") {
            let p = fields::child(path, "content");
            if let Some(s) = fields::string(v, &p, report) {
                entry.content = s;
            }
        }
        match block.take("append") {
            Some(v) => {
                let p = fields::child(path, "append");
                if let Some(b) = fields::boolean(v, &p, report) {
                    entry.append = b;
                }
            }
            None => report.push(
                fields::child(path, "append"),
                ErrorKind::RequiredFieldMissing,
            ),
        }
        if let Some(v) = block.take("container") {
            let p = fields::child(path, "container");
            entry.container = fields::string(v, &p, report);
        }

        block.deny_unknown(path, report);
        entry
    }
}

/// Paths serialize in forward-slash form regardless of the host platform.
fn forward_slash_path<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&path.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn errors_for(document: Value) -> ValidationErrors {
        CloudConfig::from_value(&document).unwrap_err()
    }

    #[test]
    fn empty_document_gets_full_defaults() {
        let config = CloudConfig::from_value(&json!({})).unwrap();
        assert_eq!(config.hostname, None);
        assert!(config.rancher.ssh.daemon);
        assert_eq!(config.rancher.ssh.port, 22);
        assert_eq!(config.rancher.state.boot_dev, "LABEL=RANCHER_BOOT");
        assert_eq!(config.rancher.state.dev, "LABEL=RANCHER_STATE");
        assert_eq!(config.rancher.state.oem_dev, "LABEL=RANCHER_OEM");
        assert_eq!(config.rancher.state.fstype, FsType::Auto);
        assert!(config.rancher.state.rngd);
        assert!(config.rancher.state.wait);
        assert_eq!(config.rancher.environment.tz, "Europe/Moscow");
        assert_eq!(
            config.rancher.network.dns.nameservers,
            vec![Ipv4Addr::new(8, 8, 8, 8), Ipv4Addr::new(8, 8, 4, 4)]
        );
        assert!(config.rancher.preload_wait);
        assert!(config.rancher.docker.is_none());
        assert!(config.write_files.is_none());
    }

    #[test]
    fn document_must_be_an_object() {
        let errs = errors_for(json!("hostname"));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs.errors()[0].path, "");
        assert_matches!(errs.errors()[0].kind, ErrorKind::TypeMismatch { .. });
    }

    #[test]
    fn unknown_top_level_field_is_rejected() {
        let errs = errors_for(json!({"foo": 1}));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs.errors()[0].path, "foo");
        assert_eq!(errs.errors()[0].kind, ErrorKind::UnknownField);
    }

    #[test]
    fn ssh_port_must_be_positive() {
        for good in [22, 2222] {
            let config =
                CloudConfig::from_value(&json!({"rancher": {"ssh": {"port": good}}})).unwrap();
            assert_eq!(config.rancher.ssh.port, good);
        }
        for bad in [0, -22] {
            let errs = errors_for(json!({"rancher": {"ssh": {"port": bad}}}));
            assert_eq!(errs.errors()[0].path, "rancher.ssh.port");
            assert_matches!(errs.errors()[0].kind, ErrorKind::TypeMismatch { .. });
        }
    }

    #[test]
    fn write_file_requires_append() {
        let errs = errors_for(json!({"write_files": [{"path": "/etc/hosts"}]}));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs.errors()[0].path, "write_files[0].append");
        assert_eq!(errs.errors()[0].kind, ErrorKind::RequiredFieldMissing);
    }

    #[test]
    fn write_file_permissions_stay_a_four_digit_string() {
        let config = CloudConfig::from_value(&json!({
            "write_files": [{"append": false, "permissions": "0644"}]
        }))
        .unwrap();
        let files = config.write_files.unwrap();
        assert_eq!(files[0].permissions, "0644");
        assert_eq!(files[0].path, PathBuf::from("/tmp"));
        assert_eq!(files[0].owner, User::Root);

        for bad in ["400", "04000"] {
            let errs = errors_for(json!({
                "write_files": [{"append": false, "permissions": bad}]
            }));
            assert_eq!(errs.errors()[0].path, "write_files[0].permissions");
            assert_matches!(errs.errors()[0].kind, ErrorKind::PatternMismatch { .. });
        }
    }

    #[test]
    fn interface_shape_is_chosen_structurally() {
        let config = CloudConfig::from_value(&json!({
            "rancher": {"network": {"interfaces": {
                "wlan0": {"wifi_network": "home"},
                "eth0": {"address": "10.0.0.5/24"}
            }}}
        }))
        .unwrap();
        let interfaces = config.rancher.network.interfaces.unwrap();
        assert_matches!(&interfaces["wlan0"], Interface::Wireless(wireless) => {
            assert!(wireless.dhcp);
            assert_eq!(wireless.wifi_network, "home");
            assert!(wireless.address.is_none());
        });
        assert_matches!(&interfaces["eth0"], Interface::Wired(wired) => {
            assert!(wired.dhcp);
            assert_eq!(wired.address.unwrap().to_string(), "10.0.0.5/24");
        });
    }

    #[test]
    fn interface_must_be_an_object() {
        let errs = errors_for(json!({
            "rancher": {"network": {"interfaces": {"eth0": "dhcp"}}}
        }));
        assert_eq!(errs.errors()[0].path, "rancher.network.interfaces.eth0");
        assert_matches!(errs.errors()[0].kind, ErrorKind::TypeMismatch { .. });
    }

    #[test]
    fn wireless_interface_requires_a_named_network() {
        let errs = errors_for(json!({
            "rancher": {"network": {"interfaces": {"wlan0": {"wifi_network": "  "}}}}
        }));
        assert_eq!(errs.errors()[0].path, "rancher.network.interfaces.wlan0.wifi_network");
    }

    #[test]
    fn wifi_network_requires_credentials() {
        let errs = errors_for(json!({
            "rancher": {"network": {"wifi_networks": {"home": {"scan_ssid": 0}}}}
        }));
        let paths: Vec<_> = errs.errors().iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"rancher.network.wifi_networks.home.ssid"));
        assert!(paths.contains(&"rancher.network.wifi_networks.home.psk"));
        assert_matches!(errs.errors()[0].kind, ErrorKind::RequiredFieldMissing);
    }

    #[test]
    fn runcmd_accepts_shell_lines_and_argv_vectors() {
        let config = CloudConfig::from_value(&json!({
            "rancher": {"runcmd": ["sysctl -p", ["touch", "/run/ready"]]}
        }))
        .unwrap();
        assert_eq!(
            config.rancher.runcmd,
            vec![
                BootCommand::Shell("sysctl -p".to_string()),
                BootCommand::Exec(vec!["touch".to_string(), "/run/ready".to_string()]),
            ]
        );

        let errs = errors_for(json!({"rancher": {"runcmd": [42]}}));
        assert_eq!(errs.errors()[0].path, "rancher.runcmd[0]");
        assert_matches!(errs.errors()[0].kind, ErrorKind::TypeMismatch { .. });
    }

    #[test]
    fn services_include_rejects_undeclared_toggles() {
        let config = CloudConfig::from_value(&json!({
            "rancher": {"services_include": {"open-vm-tools": true, "zfs": true}}
        }))
        .unwrap();
        assert!(config.rancher.services_include.open_vm_tools);
        assert!(config.rancher.services_include.zfs);
        assert!(!config.rancher.services_include.waagent);

        let errs = errors_for(json!({
            "rancher": {"services_include": {"frobnicator": true}}
        }));
        assert_eq!(errs.errors()[0].path, "rancher.services_include.frobnicator");
        assert_eq!(errs.errors()[0].kind, ErrorKind::UnknownField);
    }

    #[test]
    fn state_autoformat_devices_are_normalized() {
        let config = CloudConfig::from_value(&json!({
            "rancher": {"state": {"autoformat": ["/DEV/SDA", "/dev/vdb"]}}
        }))
        .unwrap();
        assert_eq!(config.rancher.state.autoformat[0], "/dev/sda");
        assert_eq!(config.rancher.state.autoformat[1], "/dev/vdb");
    }

    #[test]
    fn state_labels_are_validated_in_place() {
        let config = CloudConfig::from_value(&json!({
            "rancher": {"state": {"dev": "label=rancher_data", "fstype": "ext4"}}
        }))
        .unwrap();
        assert_eq!(config.rancher.state.dev, "LABEL=RANCHER_DATA");
        assert_eq!(config.rancher.state.fstype, FsType::Ext4);

        let errs = errors_for(json!({"rancher": {"state": {"dev": "LABEL=OTHER"}}}));
        assert_eq!(errs.errors()[0].path, "rancher.state.dev");
        assert_matches!(errs.errors()[0].kind, ErrorKind::PatternMismatch { .. });
    }

    #[test]
    fn docker_engine_version_is_constrained() {
        let config = CloudConfig::from_value(&json!({
            "rancher": {"docker": {"engine": "docker-17.03.2"}}
        }))
        .unwrap();
        assert_eq!(config.rancher.docker.unwrap().engine.unwrap(), "docker-17.03.2");

        let errs = errors_for(json!({"rancher": {"docker": {"engine": "docker-17"}}}));
        assert_eq!(errs.errors()[0].path, "rancher.docker.engine");
    }

    #[test]
    fn violations_accumulate_across_the_tree() {
        let errs = errors_for(json!({
            "bogus": true,
            "rancher": {"ssh": {"port": 0}, "state": {"dev": "LABEL=OTHER"}},
            "write_files": [{"permissions": "99"}]
        }));
        let paths: Vec<_> = errs.errors().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(errs.len(), 5);
        assert!(paths.contains(&"bogus"));
        assert!(paths.contains(&"rancher.ssh.port"));
        assert!(paths.contains(&"rancher.state.dev"));
        assert!(paths.contains(&"write_files[0].append"));
        assert!(paths.contains(&"write_files[0].permissions"));
    }
}
