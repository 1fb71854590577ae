use std::sync::Arc;

use tracing::{debug, warn};

use super::{DigTool, DnsOptions, LibraryLookup, RecordKind, RecordLookup};
use crate::cache::TtlCache;
use crate::clock::Clock;
use crate::validator::normalize_domain;

const TOOL_KINDS: &[RecordKind] = &[RecordKind::Mx, RecordKind::A, RecordKind::Aaaa];
const LIBRARY_KINDS: &[RecordKind] = &[RecordKind::Mx, RecordKind::Any];

/// Répond « ce domaine peut-il recevoir du courrier ? » avec un cache TTL.
///
/// Ordre des sources: outil système (MX, A, AAAA) puis résolveur embarqué
/// (MX, ANY). Le premier résultat non vide suffit. Les échecs d'une source
/// sont traités comme une réponse vide; les négatifs sont aussi mis en cache.
pub struct DomainResolver {
    tool: Option<Arc<dyn RecordLookup>>,
    library: Option<Arc<dyn RecordLookup>>,
    cache: TtlCache<bool>,
}

impl DomainResolver {
    pub fn new(
        tool: Option<Arc<dyn RecordLookup>>,
        library: Option<Arc<dyn RecordLookup>>,
        cache: TtlCache<bool>,
    ) -> Self {
        Self {
            tool,
            library,
            cache,
        }
    }

    pub fn from_options(options: &DnsOptions, clock: Arc<dyn Clock>) -> Self {
        let tool = options.use_tool.then(|| {
            Arc::new(DigTool::new(&options.tool_program, options.tool_timeout()))
                as Arc<dyn RecordLookup>
        });
        let library = if options.use_library {
            match LibraryLookup::from_system_conf() {
                Ok(lookup) => Some(Arc::new(lookup) as Arc<dyn RecordLookup>),
                Err(err) => {
                    warn!(error = %err, "library resolver unavailable, tool stage only");
                    None
                }
            }
        } else {
            None
        };
        Self::new(tool, library, TtlCache::new(options.cache_ttl(), clock))
    }

    pub async fn resolvable(&self, domain: &str) -> bool {
        let Some(ascii) = normalize_domain(domain) else {
            return false;
        };
        if let Some(hit) = self.cache.get(&ascii) {
            debug!(domain = %ascii, resolvable = hit, "domain cache hit");
            return hit;
        }
        let found = self.lookup_uncached(&ascii).await;
        self.cache.insert(ascii, found);
        found
    }

    async fn lookup_uncached(&self, domain: &str) -> bool {
        let stages = [
            ("tool", &self.tool, TOOL_KINDS),
            ("library", &self.library, LIBRARY_KINDS),
        ];
        for (stage, source, kinds) in stages {
            let Some(source) = source else { continue };
            for &kind in kinds {
                match source.lookup(kind, domain).await {
                    Ok(records) if !records.is_empty() => {
                        debug!(domain, stage, %kind, records = records.len(), "domain resolvable");
                        return true;
                    }
                    Ok(_) => {}
                    Err(err) => debug!(domain, stage, %kind, error = %err, "lookup failed"),
                }
            }
        }
        debug!(domain, "domain not resolvable");
        false
    }

    #[cfg(test)]
    pub(crate) fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}
