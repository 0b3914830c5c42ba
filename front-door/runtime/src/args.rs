use crate::{log::LogArgs, FrontDoor};
use anyhow::Result;
use clap::Parser;
use ipnet::IpNet;
use front_door_core::{AvailabilityProber, DestinationDirectory, DestinationPorts};
use front_door_routing::{
    HashKey, ManagementDestinations, RouteMetrics, Router, RouterConfig,
};
use prometheus_client::registry::Registry;
use std::{num::NonZeroU16, path::PathBuf};

#[derive(Clone, Debug, Parser)]
#[clap(name = "front-door", about = "Routes and governs storage cluster requests")]
pub struct Args {
    #[clap(flatten)]
    pub log: LogArgs,

    #[clap(flatten)]
    pub router: RouterArgs,
}

#[derive(Clone, Debug, clap::Args)]
pub struct RouterArgs {
    /// The domain under which tenants are served as subdomains. Requests for
    /// the domain itself are sent to the management API.
    #[clap(long, env = "FRONT_DOOR_SERVICE_DOMAIN")]
    pub service_domain: String,

    #[clap(long, env = "FRONT_DOOR_READ_PORT")]
    pub read_port: NonZeroU16,

    #[clap(long, env = "FRONT_DOOR_WRITE_PORT")]
    pub write_port: NonZeroU16,

    /// Routes every tenant request to the tenant's first available host.
    #[clap(
        long,
        env = "FRONT_DOOR_ALWAYS_FIRST_HOST",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub always_first_host: bool,

    /// A file whose first 32 bytes key destination hashing. A random key is
    /// generated when unset.
    #[clap(long, env = "FRONT_DOOR_HASH_KEY_PATH")]
    pub hash_key_path: Option<PathBuf>,

    /// Whitespace-separated `host:port` management API endpoints.
    #[clap(long, env = "FRONT_DOOR_MANAGEMENT_DESTINATIONS")]
    pub management_destinations: String,

    /// Comma-separated networks of proxies whose `X-Forwarded-For` headers
    /// are trusted. Other peers are authorized by their own address.
    #[clap(long, env = "FRONT_DOOR_TRUSTED_PROXIES")]
    pub trusted_proxies: Option<IpNets>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IpNets(pub Vec<IpNet>);

// === impl Args ===

impl Args {
    #[inline]
    pub fn parse_and_build<D, A>(directory: D, prober: A) -> Result<FrontDoor<D, A>>
    where
        D: DestinationDirectory,
        A: AvailabilityProber,
    {
        Self::parse().build(directory, prober)
    }

    /// Installs the global log subscriber and assembles the front door.
    pub fn build<D, A>(self, directory: D, prober: A) -> Result<FrontDoor<D, A>>
    where
        D: DestinationDirectory,
        A: AvailabilityProber,
    {
        let Self { log, router } = self;
        log.try_init()?;
        FrontDoor::new(router, directory, prober)
    }
}

// === impl IpNets ===

impl std::str::FromStr for IpNets {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        s.split(',')
            .map(|n| n.trim().parse().map_err(Into::into))
            .collect::<Result<Vec<IpNet>>>()
            .map(Self)
    }
}

impl IpNets {
    pub fn contains(&self, addr: &std::net::IpAddr) -> bool {
        let addr = addr.to_canonical();
        self.0.iter().any(|net| net.contains(&addr))
    }
}

// === impl RouterArgs ===

impl RouterArgs {
    pub fn build<D, A>(self, directory: D, prober: A, prom: &mut Registry) -> Result<Router<D, A>>
    where
        D: DestinationDirectory,
        A: AvailabilityProber,
    {
        let Self {
            service_domain,
            read_port,
            write_port,
            always_first_host,
            hash_key_path,
            management_destinations,
            trusted_proxies: _,
        } = self;

        let management = management_destinations.parse::<ManagementDestinations>()?;
        let key = match hash_key_path {
            Some(path) => HashKey::from_file(&path)?,
            None => {
                tracing::info!("No hash key configured; using a random key");
                HashKey::generate()
            }
        };
        let metrics = RouteMetrics::register(prom.sub_registry_with_prefix("route"));

        tracing::info!(
            %service_domain,
            %read_port,
            %write_port,
            always_first_host,
            management = management.len(),
            "Routing"
        );
        let config = RouterConfig {
            service_domain,
            ports: DestinationPorts {
                read: read_port,
                write: write_port,
            },
            always_first_host,
        };
        Ok(Router::new(
            config,
            management,
            &key,
            directory,
            prober,
            metrics,
        ))
    }
}
