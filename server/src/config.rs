use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8000;
/// Extra ports tried after `DEFAULT_PORT` when it is taken.
pub const DEFAULT_PORT_SPAN: u16 = 10;
pub const DEFAULT_BIND: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_STATIC_DIR: &str = "client/dist";
pub const TOPOLOGY_FILE: &str = "topology.json";

pub const TOPOLOGY_CACHE_CONTROL: &str = "public, max-age=60";
pub const DATA_CACHE_CONTROL: &str = "public, max-age=60";
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

pub fn port() -> u16 {
    std::env::var("BORDERPAINT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_PORT)
}

pub fn port_span() -> u16 {
    std::env::var("BORDERPAINT_PORT_SPAN")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT_SPAN)
}

/// Candidate ports in bind order, clamped at `u16::MAX`.
pub fn port_candidates() -> std::ops::RangeInclusive<u16> {
    let first = port();
    first..=first.saturating_add(port_span())
}

pub fn bind_address() -> IpAddr {
    std::env::var("BORDERPAINT_BIND")
        .ok()
        .and_then(|value| value.trim().parse::<IpAddr>().ok())
        .unwrap_or(DEFAULT_BIND)
}

pub fn data_dir() -> PathBuf {
    dir_from_env("BORDERPAINT_DATA_DIR", DEFAULT_DATA_DIR)
}

pub fn static_dir() -> PathBuf {
    dir_from_env("BORDERPAINT_STATIC_DIR", DEFAULT_STATIC_DIR)
}

pub fn topology_path() -> PathBuf {
    std::env::var("BORDERPAINT_TOPOLOGY")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir().join(TOPOLOGY_FILE))
}

fn dir_from_env(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_env() {
        temp_env::with_vars_unset(
            [
                "BORDERPAINT_PORT",
                "BORDERPAINT_PORT_SPAN",
                "BORDERPAINT_BIND",
                "BORDERPAINT_DATA_DIR",
                "BORDERPAINT_TOPOLOGY",
            ],
            || {
                assert_eq!(port_candidates(), 8000..=8010);
                assert_eq!(bind_address(), DEFAULT_BIND);
                assert_eq!(topology_path(), PathBuf::from("data/topology.json"));
            },
        );
    }

    #[test]
    fn invalid_overrides_fall_back() {
        temp_env::with_vars(
            [
                ("BORDERPAINT_PORT", Some("0")),
                ("BORDERPAINT_PORT_SPAN", Some("lots")),
                ("BORDERPAINT_BIND", Some("localhost:80")),
                ("BORDERPAINT_DATA_DIR", Some("   ")),
            ],
            || {
                assert_eq!(port(), DEFAULT_PORT);
                assert_eq!(port_span(), DEFAULT_PORT_SPAN);
                assert_eq!(bind_address(), DEFAULT_BIND);
                assert_eq!(data_dir(), PathBuf::from(DEFAULT_DATA_DIR));
            },
        );
    }

    #[test]
    fn overrides_are_honoured() {
        temp_env::with_vars(
            [
                ("BORDERPAINT_PORT", Some("9100")),
                ("BORDERPAINT_PORT_SPAN", Some("0")),
                ("BORDERPAINT_BIND", Some("0.0.0.0")),
                ("BORDERPAINT_DATA_DIR", Some("/srv/maps")),
                ("BORDERPAINT_TOPOLOGY", None),
            ],
            || {
                assert_eq!(port_candidates(), 9100..=9100);
                assert_eq!(bind_address().to_string(), "0.0.0.0");
                assert_eq!(topology_path(), PathBuf::from("/srv/maps/topology.json"));
            },
        );
    }

    #[test]
    fn port_range_saturates() {
        temp_env::with_vars(
            [
                ("BORDERPAINT_PORT", Some("65530")),
                ("BORDERPAINT_PORT_SPAN", Some("20")),
            ],
            || assert_eq!(port_candidates(), 65530..=u16::MAX),
        );
    }
}
