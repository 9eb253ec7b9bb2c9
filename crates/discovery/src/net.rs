use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use tracing::debug;

/// Well-known external address used to pick the outbound interface.
///
/// No packet is sent; connecting a UDP socket only asks the OS for a route.
pub const PROBE_ADDR: (&str, u16) = ("8.8.8.8", 1);

/// Returns the address of the interface the OS would route LAN/Internet
/// traffic through.
///
/// Falls back to `127.0.0.1` when there is no route (offline host,
/// sandbox, etc.).
pub fn outbound_ip() -> IpAddr {
    match probe_route() {
        Ok(ip) if !ip.is_unspecified() => ip,
        Ok(_) => {
            debug!("route probe returned an unspecified address, using loopback");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
        Err(e) => {
            debug!(error = %e, "route probe failed, using loopback");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

fn probe_route() -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect(PROBE_ADDR)?;
    Ok(socket.local_addr()?.ip())
}

/// Returns all non-loopback, non-link-local IPv4 interface addresses.
pub fn get_local_ips() -> Vec<IpAddr> {
    let mut ips = Vec::new();

    let Ok(interfaces) = if_addrs::get_if_addrs() else {
        return ips;
    };

    for iface in interfaces {
        if iface.is_loopback() {
            continue;
        }
        if let IpAddr::V4(ipv4) = iface.ip() {
            if ipv4.is_loopback() {
                continue;
            }
            // Skip link-local (169.254.x.x / APIPA)
            if ipv4.is_link_local() {
                continue;
            }
            ips.push(IpAddr::V4(ipv4));
        }
    }

    ips
}

/// Returns the machine hostname, or `"unknown"`.
pub fn get_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".into())
}
