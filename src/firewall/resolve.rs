//! Host-side DNS resolution of allowlist domains, run as a background task.

use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use hickory_resolver::config::LookupIpStrategy;
use hickory_resolver::proto::rr::RData;
use hickory_resolver::system_conf::read_system_conf;
use hickory_resolver::TokioAsyncResolver;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{Resolution, ResolvedEntry};
use crate::config::{AllowTarget, FirewallEntry};

/// Result of looking up one host name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostLookup {
    pub addrs: Vec<IpAddr>,
    /// First CNAME target seen in the answer, if the name is an alias.
    pub cname: Option<String>,
}

/// Name lookups used by the firewall compiler.
pub trait DomainResolver: Send + Sync + 'static {
    fn lookup_host(&self, domain: &str) -> impl Future<Output = io::Result<HostLookup>> + Send;

    /// A records only.
    fn lookup_ipv4(&self, name: &str) -> impl Future<Output = io::Result<Vec<Ipv4Addr>>> + Send;
}

/// Resolver backed by the host's resolv.conf and hosts file.
pub struct SystemResolver {
    inner: TokioAsyncResolver,
}

impl SystemResolver {
    pub fn from_system_conf() -> io::Result<Self> {
        let (config, mut opts) = read_system_conf().map_err(io::Error::other)?;
        opts.ip_strategy = LookupIpStrategy::Ipv4AndIpv6;
        Ok(Self {
            inner: TokioAsyncResolver::tokio(config, opts),
        })
    }
}

impl DomainResolver for SystemResolver {
    async fn lookup_host(&self, domain: &str) -> io::Result<HostLookup> {
        let lookup = self
            .inner
            .lookup_ip(domain)
            .await
            .map_err(io::Error::other)?;

        let cname = lookup
            .as_lookup()
            .record_iter()
            .find_map(|record| match record.data() {
                Some(RData::CNAME(target)) => Some(target.0.to_utf8()),
                _ => None,
            });

        Ok(HostLookup {
            addrs: lookup.iter().collect(),
            cname,
        })
    }

    async fn lookup_ipv4(&self, name: &str) -> io::Result<Vec<Ipv4Addr>> {
        let lookup = self
            .inner
            .ipv4_lookup(name)
            .await
            .map_err(io::Error::other)?;
        Ok(lookup.iter().map(|a| a.0).collect())
    }
}

/// Resolve every domain entry in order, passing CIDRs through.
///
/// The domain name is sent on `progress` right before its lookup starts. A
/// domain that fails to resolve is dropped with a warning. CNAMEs are
/// followed one level: the alias target gets its own A lookup and those
/// addresses are merged in.
pub async fn resolve_entries<R: DomainResolver>(
    entries: &[FirewallEntry],
    resolver: &R,
    progress: Option<&mpsc::UnboundedSender<String>>,
) -> Resolution {
    let mut resolution = Resolution::default();

    for entry in entries {
        let domain = match &entry.target {
            AllowTarget::Cidr(_) => {
                resolution.cidrs.push(entry.clone());
                continue;
            }
            AllowTarget::Domain(domain) => domain,
        };

        if let Some(tx) = progress {
            let _ = tx.send(domain.clone());
        }

        let lookup = match resolver.lookup_host(domain).await {
            Ok(lookup) => lookup,
            Err(e) => {
                warn!("cannot resolve {}: {}", domain, e);
                continue;
            }
        };

        let mut addrs = lookup.addrs;
        if let Some(cname) = &lookup.cname {
            match resolver.lookup_ipv4(cname).await {
                Ok(v4) => addrs.extend(v4.into_iter().map(IpAddr::V4)),
                Err(e) => debug!("A lookup for {} (alias of {}) failed: {}", cname, domain, e),
            }
        }

        resolution.domains.push(ResolvedEntry::from_addrs(
            domain.as_str(),
            entry.domain_ports(),
            addrs,
        ));
    }

    resolution
}

/// Handle to a resolution running in the background.
///
/// Dropping the handle aborts the task.
pub struct ResolutionTask {
    progress: mpsc::UnboundedReceiver<String>,
    result: Option<oneshot::Receiver<Resolution>>,
    handle: JoinHandle<()>,
}

/// Start resolving `entries` on the tokio runtime.
pub fn spawn_resolution<R: DomainResolver>(
    entries: Vec<FirewallEntry>,
    resolver: Arc<R>,
) -> ResolutionTask {
    let (progress_tx, progress_rx) = mpsc::unbounded_channel();
    let (result_tx, result_rx) = oneshot::channel();

    let handle = tokio::spawn(async move {
        let resolution = resolve_entries(&entries, resolver.as_ref(), Some(&progress_tx)).await;
        // Close progress before handing over the result
        drop(progress_tx);
        let _ = result_tx.send(resolution);
    });

    ResolutionTask {
        progress: progress_rx,
        result: Some(result_rx),
        handle,
    }
}

impl ResolutionTask {
    /// Take the result if resolution has already finished.
    pub fn try_finish(&mut self) -> Option<Resolution> {
        let rx = self.result.as_mut()?;
        match rx.try_recv() {
            Ok(resolution) => {
                self.result = None;
                Some(resolution)
            }
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                self.result = None;
                None
            }
        }
    }

    /// Wait for the result, reporting each domain as its lookup starts.
    ///
    /// `None` if the task died without producing a result.
    pub async fn finish(mut self, mut on_progress: impl FnMut(&str)) -> Option<Resolution> {
        if let Some(resolution) = self.try_finish() {
            return Some(resolution);
        }
        while let Some(domain) = self.progress.recv().await {
            on_progress(&domain);
        }
        self.result.take()?.await.ok()
    }

    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl Drop for ResolutionTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
