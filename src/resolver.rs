use crate::{
    cache::RecordCache,
    error::ResolveError,
    protocol::{Packet, Record, RecordType, ID},
    transport::{Socket, Transport},
};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use rand::prelude::*;
use std::net::IpAddr;
use tokio::net::UdpSocket;
use tracing::debug;

/// How many CNAME hops a single lookup may follow before giving up.
pub const MAX_INDIRECTION_LEVEL: u32 = 10;

/// Iterative resolver: walks the delegation hierarchy from a configured root
/// nameserver, filling the record cache as it goes.
///
/// One lookup at a time; the shell drives it sequentially and may swap the
/// root server between lookups.
pub struct Resolver<S = UdpSocket> {
    transport: Transport<S>,
    cache: Mutex<RecordCache>,
    root: IpAddr,
    trace: bool,
    single_probe: bool,
}

impl<S: Socket + Send + Sync> Resolver<S> {
    pub fn new(transport: Transport<S>, root: IpAddr) -> Resolver<S> {
        Resolver {
            transport,
            cache: Mutex::new(RecordCache::new()),
            root,
            trace: false,
            single_probe: false,
        }
    }

    /// Debug mode: each lookup issues a single query to the root server and
    /// reports whatever that one reply put in the cache. No delegation walk,
    /// no alias chasing.
    pub fn with_single_probe(mut self, enabled: bool) -> Resolver<S> {
        self.single_probe = enabled;
        self
    }

    pub fn root(&self) -> IpAddr {
        self.root
    }

    pub fn set_root(&mut self, root: IpAddr) {
        self.root = root;
    }

    pub fn set_trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    pub fn cached(&self, name: &str, rtype: RecordType) -> Vec<Record> {
        self.cache.lock().lookup(name, rtype)
    }

    pub fn for_each_cached(&self, f: impl FnMut(&str, RecordType, &[Record])) {
        self.cache.lock().for_each(f);
    }

    /// Entry point for a user lookup.
    ///
    /// `indirection` counts the CNAME hops taken so far; the initial call
    /// passes 0 and each alias hop recurses with one more.
    pub fn resolve<'a>(
        &'a self,
        name: &'a str,
        rtype: RecordType,
        indirection: u32,
    ) -> BoxFuture<'a, Vec<Record>> {
        Box::pin(async move {
            if self.single_probe {
                self.query_chain(name, rtype, self.root).await;
                return self.cached(name, rtype);
            }

            if indirection > MAX_INDIRECTION_LEVEL {
                eprintln!("Maximum number of indirection levels reached.");
                return Vec::new();
            }

            let cached = self.cached(name, rtype);
            if !cached.is_empty() {
                return cached;
            }

            // A known alias may already have records of the wanted type
            // cached under its canonical name
            let aliases = self.cached(name, RecordType::CNAME);
            if let Some(canonical) = aliases.first().map(|record| record.rdata()) {
                let resolved = self.cached(&canonical, rtype);
                if !resolved.is_empty() {
                    return resolved;
                }
            }

            self.query_chain(name, rtype, self.root).await;

            let cached = self.cached(name, rtype);
            if !cached.is_empty() {
                return cached;
            }

            // Chase each alias, then file the results under the original
            // name so the cache answers this question directly next time
            for alias in self.cached(name, RecordType::CNAME) {
                let canonical = alias.rdata();
                let resolved = self.resolve(&canonical, rtype, indirection + 1).await;

                let mut cache = self.cache.lock();
                for record in &resolved {
                    cache.insert(record.renamed(name));
                }
            }

            self.cached(name, rtype)
        })
    }

    /// One step of the iterative walk: query `server`, then follow whatever
    /// delegation it returned.
    fn query_chain<'a>(
        &'a self,
        name: &'a str,
        rtype: RecordType,
        server: IpAddr,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let nameservers = self.query_server(name, rtype, server).await;

            if self.single_probe {
                return;
            }

            self.query_next_level(name, rtype, &nameservers).await;
        })
    }

    /// Picks the next hop out of a delegation, preferring nameservers whose
    /// address already arrived as glue.
    async fn query_next_level(&self, name: &str, rtype: RecordType, nameservers: &[Record]) {
        // The reply may already have settled the query, either with an
        // answer or with an alias for the resolve loop to chase
        if !self.cached(name, rtype).is_empty() {
            return;
        }
        if !self.cached(name, RecordType::CNAME).is_empty() {
            return;
        }

        let hosts: Vec<String> = nameservers
            .iter()
            .filter_map(|record| match record {
                Record::NS { nameserver, .. } => Some(nameserver.clone()),
                _ => None,
            })
            .collect();

        // The first nameserver with a cached address wins
        for host in &hosts {
            if let Some(address) = self.cached_address(host) {
                self.query_chain(name, rtype, address).await;
                return;
            }
        }

        // No glue: resolve the address of exactly one nameserver from the
        // root, so a broken delegation cannot fan out over the whole list
        if let Some(host) = hosts.first() {
            self.query_chain(host, RecordType::A, self.root).await;
            if let Some(address) = self.cached_address(host) {
                self.query_chain(name, rtype, address).await;
            }
        }
    }

    fn cached_address(&self, host: &str) -> Option<IpAddr> {
        self.cached(host, RecordType::A)
            .first()
            .and_then(Record::address)
    }

    /// One query to one server. Every failure funnels into an empty
    /// authority set here; a lookup never aborts on a bad hop.
    async fn query_server(&self, name: &str, rtype: RecordType, server: IpAddr) -> Vec<Record> {
        match self.try_query_server(name, rtype, server).await {
            Ok(nameservers) => nameservers,
            Err(error) => {
                debug!(%server, %error, "Query failed");
                Vec::new()
            }
        }
    }

    async fn try_query_server(
        &self,
        name: &str,
        rtype: RecordType,
        server: IpAddr,
    ) -> Result<Vec<Record>, ResolveError> {
        let id: ID = rand::thread_rng().gen();
        let query = Packet::query(id, name, rtype);

        if self.trace {
            println!();
            println!("Query ID     {id} {name}  {rtype} --> {server}");
        }

        let reply = self.transport.exchange(&query.to_bytes()?, server).await?;
        let response = Packet::from_bytes(&reply)?;

        if self.trace {
            self.trace_response(&response);
        }

        Ok(self.digest_response(&response))
    }

    /// Applies a decoded response to the cache and returns its authority
    /// records, in decode order.
    ///
    /// Unusable replies -- not a response, truncated, a nonzero RCODE, or an
    /// authoritative empty answer -- contribute nothing.
    fn digest_response(&self, response: &Packet) -> Vec<Record> {
        if !response.query_response()
            || response.truncated_message()
            || response.response_code() != 0
        {
            return Vec::new();
        }
        let authoritative = response.authoritative_answer();
        if authoritative && response.answers().is_empty() {
            return Vec::new();
        }

        let qname = response.questions().first().map(|q| q.domain.clone());

        let mut cache = self.cache.lock();
        for record in response.answers() {
            cache.insert(record.clone());

            // An authoritative answer that ends a CNAME chain delivers the
            // address under the canonical name; file it under the queried
            // name as well so the original question is answered
            if authoritative && matches!(record, Record::A { .. } | Record::AAAA { .. }) {
                if let Some(qname) = &qname {
                    cache.insert(record.renamed(qname));
                }
            }
        }
        for record in response.additional() {
            cache.insert(record.clone());
        }

        response.authority().to_vec()
    }

    fn trace_response(&self, response: &Packet) {
        println!(
            "Response ID: {} Authoritative = {}",
            response.id(),
            response.authoritative_answer()
        );
        println!("  Answers ({})", response.answers().len());
        for record in response.answers() {
            trace_record(record);
        }
        println!("  Nameservers ({})", response.authority().len());
        for record in response.authority() {
            trace_record(record);
        }
        println!("  Additional Information ({})", response.additional().len());
        for record in response.additional() {
            trace_record(record);
        }
    }
}

fn trace_record(record: &Record) {
    println!(
        "       {:<30} {:<10} {:<4} {}",
        record.name(),
        record.ttl(),
        record.rtype(),
        record.rdata()
    );
}
