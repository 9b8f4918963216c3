//! Static table of the services Trellis knows how to toggle.
//!
//! Each service is classified once, here. Delegated services are started and
//! stopped by the middleware task executor; local services are driven through
//! the configuration store and its rc launcher.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::SprigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Delegated,
    Local,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Delegated => "delegated",
            Classification::Local => "local",
        }
    }
}

struct CatalogEntry {
    name: &'static str,
    class: Classification,
}

const fn delegated(name: &'static str) -> CatalogEntry {
    CatalogEntry { name, class: Classification::Delegated }
}

const fn local(name: &'static str) -> CatalogEntry {
    CatalogEntry { name, class: Classification::Local }
}

const CATALOG: &[CatalogEntry] = &[
    delegated("afp"),
    delegated("cifs"),
    delegated("dyndns"),
    delegated("ftp"),
    delegated("glusterd"),
    delegated("haproxy"),
    delegated("ipfs"),
    delegated("lldp"),
    delegated("nfs"),
    delegated("riak"),
    delegated("riak_cs"),
    delegated("rsyncd"),
    delegated("smartd"),
    delegated("snmp"),
    delegated("sshd"),
    delegated("stanchion"),
    delegated("swift"),
    delegated("tftpd"),
    delegated("ups"),
    delegated("webdav"),
    local("domaincontroller"),
    local("httpd"),
    local("iscsitarget"),
    local("ldap"),
];

/// UI form identifier -> canonical service name.
const FORM_NAMES: &[(&str, &str)] = &[
    ("afp_toggle", "afp"),
    ("cifs_toggle", "cifs"),
    ("domaincontroller_toggle", "domaincontroller"),
    ("dynamicdns_toggle", "dyndns"),
    ("ftp_toggle", "ftp"),
    ("glusterd_toggle", "glusterd"),
    ("haproxy_toggle", "haproxy"),
    ("httpd_toggle", "httpd"),
    ("ipfs_toggle", "ipfs"),
    ("iscsitarget_toggle", "iscsitarget"),
    ("ldap_toggle", "ldap"),
    ("lldp_toggle", "lldp"),
    ("nfs_toggle", "nfs"),
    ("riak_cs_toggle", "riak_cs"),
    ("riak_toggle", "riak"),
    ("rsync_toggle", "rsyncd"),
    ("smartd_toggle", "smartd"),
    ("snmp_toggle", "snmp"),
    ("ssh_toggle", "sshd"),
    ("stanchion_toggle", "stanchion"),
    ("tftp_toggle", "tftpd"),
    ("ups_toggle", "ups"),
    ("webdav_toggle", "webdav"),
];

/// A catalogued service. Only obtainable through [`ServiceName::lookup`] or
/// [`resolve`], so holding one means the name is known.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceName {
    name: &'static str,
    class: Classification,
}

impl ServiceName {
    pub fn lookup(name: &str) -> Result<Self, SprigError> {
        CATALOG
            .iter()
            .find(|entry| entry.name == name)
            .map(ServiceName::from_entry)
            .ok_or_else(|| SprigError::UnknownService(name.to_string()))
    }

    fn from_entry(entry: &CatalogEntry) -> Self {
        ServiceName { name: entry.name, class: entry.class }
    }

    pub fn as_str(&self) -> &'static str {
        self.name
    }

    pub fn classification(&self) -> Classification {
        self.class
    }

    pub fn all() -> impl Iterator<Item = ServiceName> {
        CATALOG.iter().map(ServiceName::from_entry)
    }

    pub fn with_class(class: Classification) -> impl Iterator<Item = ServiceName> {
        CATALOG
            .iter()
            .filter(move |entry| entry.class == class)
            .map(ServiceName::from_entry)
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Debug for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceName({})", self.name)
    }
}

impl Serialize for ServiceName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

impl<'de> Deserialize<'de> for ServiceName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        ServiceName::lookup(&name).map_err(serde::de::Error::custom)
    }
}

/// Map a UI form identifier (`ssh_toggle`) to its canonical name, if any.
pub fn form_to_service(form: &str) -> Option<&'static str> {
    FORM_NAMES
        .iter()
        .find(|(f, _)| *f == form)
        .map(|(_, name)| *name)
}

/// Resolve a toggle target: form identifiers first, then canonical names.
pub fn resolve(target: &str) -> Result<ServiceName, SprigError> {
    let name = form_to_service(target).unwrap_or(target);
    ServiceName::lookup(name)
}
