//! Tool registry: maps tool identifiers to argument-vector commands and
//! execution lanes.
//!
//! Commands are built from a validated [`ScanTarget`] (or its resolved IP)
//! only; raw user text never reaches a command line, and no shell is
//! involved anywhere.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ToolError;
use crate::models::scan::ScanTarget;

/// Execution lane for a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    /// Needs raw-socket / OS-fingerprinting capability; runs via `sudo -n`.
    Privileged,
    Unprivileged,
}

/// All tools known to the registry, with their wire identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolId {
    #[serde(rename = "nmap-sV-A-O")]
    NmapServiceOs,
    #[serde(rename = "nmap-script-vuln")]
    NmapVulnScripts,
    #[serde(rename = "nikto")]
    Nikto,
    #[serde(rename = "whatweb")]
    Whatweb,
    #[serde(rename = "nuclei")]
    Nuclei,
    #[serde(rename = "amass")]
    Amass,
    #[serde(rename = "httpx")]
    Httpx,
    #[serde(rename = "subfinder")]
    Subfinder,
    #[serde(rename = "dnsx")]
    Dnsx,
    #[serde(rename = "naabu")]
    Naabu,
    #[serde(rename = "wappalyzer")]
    Wappalyzer,
    #[serde(rename = "testssl")]
    Testssl,
    #[serde(rename = "feroxbuster")]
    Feroxbuster,
}

impl ToolId {
    pub const ALL: [ToolId; 13] = [
        Self::NmapServiceOs,
        Self::NmapVulnScripts,
        Self::Nikto,
        Self::Whatweb,
        Self::Nuclei,
        Self::Amass,
        Self::Httpx,
        Self::Subfinder,
        Self::Dnsx,
        Self::Naabu,
        Self::Wappalyzer,
        Self::Testssl,
        Self::Feroxbuster,
    ];

    /// Wire identifier, as accepted in scan requests.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NmapServiceOs => "nmap-sV-A-O",
            Self::NmapVulnScripts => "nmap-script-vuln",
            Self::Nikto => "nikto",
            Self::Whatweb => "whatweb",
            Self::Nuclei => "nuclei",
            Self::Amass => "amass",
            Self::Httpx => "httpx",
            Self::Subfinder => "subfinder",
            Self::Dnsx => "dnsx",
            Self::Naabu => "naabu",
            Self::Wappalyzer => "wappalyzer",
            Self::Testssl => "testssl",
            Self::Feroxbuster => "feroxbuster",
        }
    }

    pub fn lane(self) -> Lane {
        match self {
            Self::NmapServiceOs | Self::NmapVulnScripts => Lane::Privileged,
            _ => Lane::Unprivileged,
        }
    }

    /// Privileged scanners take the resolved IP instead of the hostname,
    /// avoiding a redundant DNS lookup inside the tool.
    pub fn needs_resolved_ip(self) -> bool {
        matches!(self, Self::NmapServiceOs | Self::NmapVulnScripts)
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolId {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

/// A fully built command ready for the executor: program, argument
/// vector, lane, and optional stdin payload for list-reading tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub tool: ToolId,
    pub program: &'static str,
    pub args: Vec<String>,
    pub lane: Lane,
    pub stdin: Option<String>,
}

/// Build the command for one tool against a validated target.
///
/// `resolved_ip` must be provided for tools that report
/// [`ToolId::needs_resolved_ip`].
pub fn build_command(
    tool: ToolId,
    target: &ScanTarget,
    resolved_ip: Option<IpAddr>,
) -> Result<ToolCommand, ToolError> {
    let url = target.url.as_str();
    let domain = target.domain.as_str();

    let (program, args, stdin): (&'static str, Vec<String>, Option<String>) = match tool {
        ToolId::NmapServiceOs => {
            let ip = require_ip(resolved_ip)?;
            (
                "nmap",
                args_vec(&["-Pn", "-sV", "-A", "-O", &ip, "-T4", "--privileged"]),
                None,
            )
        }
        ToolId::NmapVulnScripts => {
            let ip = require_ip(resolved_ip)?;
            (
                "nmap",
                args_vec(&[
                    "-Pn",
                    "-sV",
                    "--script",
                    "vuln",
                    &ip,
                    "-T4",
                    "--privileged",
                ]),
                None,
            )
        }
        ToolId::Nikto => (
            "nikto",
            args_vec(&[
                "-h",
                url,
                "-Format",
                "txt",
                "-nointeractive",
                "-Tuning",
                "123bde",
            ]),
            None,
        ),
        ToolId::Whatweb => ("whatweb", args_vec(&["-a", "3", "--no-errors", url]), None),
        ToolId::Nuclei => (
            "nuclei",
            args_vec(&[
                "-u",
                url,
                "-severity",
                "low,medium,high,critical",
                "-silent",
                "-timeout",
                "5",
            ]),
            None,
        ),
        ToolId::Amass => (
            "amass",
            args_vec(&["enum", "-passive", "-d", domain, "-timeout", "10"]),
            None,
        ),
        ToolId::Httpx => (
            "httpx",
            args_vec(&[
                "-title",
                "-tech-detect",
                "-status-code",
                "-content-length",
                "-timeout",
                "10",
            ]),
            Some(format!("{domain}\n")),
        ),
        ToolId::Subfinder => (
            "subfinder",
            args_vec(&["-d", domain, "-silent", "-timeout", "10"]),
            None,
        ),
        ToolId::Dnsx => (
            "dnsx",
            args_vec(&[
                "-resp", "-a", "-aaaa", "-cname", "-mx", "-ns", "-txt", "-silent",
            ]),
            Some(format!("{domain}\n")),
        ),
        ToolId::Naabu => (
            "naabu",
            args_vec(&[
                "-host",
                domain,
                "-top-ports",
                "1000",
                "-silent",
                "-timeout",
                "10000",
            ]),
            None,
        ),
        ToolId::Wappalyzer => ("wappalyzer", vec![url.to_string()], None),
        ToolId::Testssl => (
            "testssl.sh",
            vec![
                "--fast".to_string(),
                "--parallel".to_string(),
                format!("{domain}:443"),
            ],
            None,
        ),
        ToolId::Feroxbuster => (
            "feroxbuster",
            args_vec(&[
                "-u",
                url,
                "-t",
                "10",
                "-d",
                "2",
                "-w",
                "/usr/share/wordlists/dirb/common.txt",
                "--silent",
            ]),
            None,
        ),
    };

    Ok(ToolCommand {
        tool,
        program,
        args,
        lane: tool.lane(),
        stdin,
    })
}

fn require_ip(resolved_ip: Option<IpAddr>) -> Result<String, ToolError> {
    resolved_ip
        .map(|ip| ip.to_string())
        .ok_or_else(|| ToolError::Resolve("no resolved address for target".to_string()))
}

fn args_vec(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}
