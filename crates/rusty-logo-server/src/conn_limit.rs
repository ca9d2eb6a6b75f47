//! Per-IP cap on concurrently open sessions.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

type ActiveMap = Arc<Mutex<HashMap<IpAddr, u32>>>;

/// Counts open sessions per client IP and refuses new ones past the limit.
pub struct ConnectionLimiter {
    max_per_ip: u32,
    active: ActiveMap,
}

impl ConnectionLimiter {
    pub fn new(max_per_ip: u32) -> Self {
        Self {
            max_per_ip,
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Reserve a slot for `ip`. The slot is released when the permit drops.
    /// Returns `None` if the IP already has `max_per_ip` open sessions.
    pub fn try_acquire(&self, ip: IpAddr) -> Option<ConnectionPermit> {
        let mut map = lock(&self.active);
        let count = map.entry(ip).or_default();

        if *count >= self.max_per_ip {
            warn!(%ip, count = *count, limit = self.max_per_ip,
                "Connection limit reached for IP");
            return None;
        }

        *count += 1;
        Some(ConnectionPermit {
            ip,
            active: self.active.clone(),
        })
    }
}

/// Held for the lifetime of one session.
#[derive(Debug)]
pub struct ConnectionPermit {
    ip: IpAddr,
    active: ActiveMap,
}

impl Drop for ConnectionPermit {
    fn drop(&mut self) {
        let mut map = lock(&self.active);
        if let Some(count) = map.get_mut(&self.ip) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                map.remove(&self.ip);
            }
        }
        debug!(ip = %self.ip, "Connection slot released");
    }
}

fn lock(map: &ActiveMap) -> MutexGuard<'_, HashMap<IpAddr, u32>> {
    // counts stay consistent even if a holder panicked mid-update
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_limiter_allows() {
        let limiter = ConnectionLimiter::new(3);
        let ip = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1));

        let _a = limiter.try_acquire(ip).unwrap();
        let _b = limiter.try_acquire(ip).unwrap();
        let _c = limiter.try_acquire(ip).unwrap();
        assert!(limiter.try_acquire(ip).is_none());
    }

    #[test]
    fn test_limiter_blocks() {
        let limiter = ConnectionLimiter::new(2);
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

        let _a = limiter.try_acquire(ip).unwrap();
        let _b = limiter.try_acquire(ip).unwrap();
        assert!(limiter.try_acquire(ip).is_none());
    }

    #[test]
    fn test_limiter_different_ips() {
        let limiter = ConnectionLimiter::new(1);
        let ip1 = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let ip2 = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

        let _a = limiter.try_acquire(ip1).unwrap();
        let _b = limiter.try_acquire(ip2).unwrap();
        assert!(limiter.try_acquire(ip1).is_none());
        assert!(limiter.try_acquire(ip2).is_none());
    }

    #[test]
    fn test_permit_drop_releases() {
        let limiter = ConnectionLimiter::new(1);
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

        let permit = limiter.try_acquire(ip).unwrap();
        assert!(limiter.try_acquire(ip).is_none());
        drop(permit);
        assert!(lock(&limiter.active).is_empty());
        assert!(limiter.try_acquire(ip).is_some());
    }
}
