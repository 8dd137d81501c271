//! Route lookup.
//!
//! # Design Decisions
//! - Routes are compiled from config at startup (and on reload) into an
//!   immutable table; lookups take no locks
//! - Ordered by priority, then by prefix length, so the most specific route
//!   wins; first match ends the scan
//! - Explicit no-match rather than a silent default

use std::collections::HashMap;

use crate::config::{RouteClass, RouteConfig, ServiceConfig};
use crate::routing::matcher::PathPrefixMatcher;

/// A route compiled together with its target service's base URL.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    pub name: String,
    pub service: String,
    pub base_url: String,
    pub route_class: RouteClass,
    pub strip_prefix: bool,
    matcher: PathPrefixMatcher,
}

impl CompiledRoute {
    /// Outbound path for a matched inbound path.
    pub fn outbound_path(&self, path: &str) -> String {
        if self.strip_prefix {
            self.matcher.strip(path)
        } else {
            path.to_string()
        }
    }
}

/// Immutable, priority-ordered route table.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
}

impl RouteTable {
    /// Compile a route table from configuration. Routes referencing unknown
    /// services are skipped (validation reports them before this runs).
    pub fn from_config(routes: &[RouteConfig], services: &[ServiceConfig]) -> Self {
        let base_urls: HashMap<&str, &str> = services
            .iter()
            .map(|s| (s.name.as_str(), s.base_url.as_str()))
            .collect();

        let mut ordered: Vec<&RouteConfig> = routes.iter().collect();
        ordered.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(b.path_prefix.len().cmp(&a.path_prefix.len()))
        });

        let compiled = ordered
            .into_iter()
            .filter_map(|route| {
                let base_url = base_urls.get(route.service.as_str())?;
                Some(CompiledRoute {
                    name: route.name.clone(),
                    service: route.service.clone(),
                    base_url: base_url.trim_end_matches('/').to_string(),
                    route_class: route.route_class,
                    strip_prefix: route.strip_prefix,
                    matcher: PathPrefixMatcher::new(route.path_prefix.clone()),
                })
            })
            .collect();

        Self { routes: compiled }
    }

    /// First matching route for `path`, or None.
    pub fn match_path(&self, path: &str) -> Option<&CompiledRoute> {
        self.routes.iter().find(|route| route.matcher.matches(path))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(name: &str, base: &str) -> ServiceConfig {
        ServiceConfig {
            name: name.into(),
            base_url: base.into(),
        }
    }

    fn route(name: &str, prefix: &str, service: &str, priority: u32) -> RouteConfig {
        RouteConfig {
            name: name.into(),
            path_prefix: prefix.into(),
            service: service.into(),
            route_class: RouteClass::Default,
            priority,
            strip_prefix: true,
        }
    }

    #[test]
    fn test_most_specific_prefix_wins() {
        let services = vec![
            service("metadata", "http://127.0.0.1:3000"),
            service("search", "http://127.0.0.1:3001"),
        ];
        let routes = vec![
            route("catchall", "/api", "metadata", 0),
            route("search", "/api/search", "search", 0),
        ];
        let table = RouteTable::from_config(&routes, &services);

        assert_eq!(table.match_path("/api/search/q").unwrap().service, "search");
        assert_eq!(table.match_path("/api/programs").unwrap().service, "metadata");
        assert!(table.match_path("/health").is_none());
    }

    #[test]
    fn test_priority_overrides_length() {
        let services = vec![
            service("a", "http://127.0.0.1:3000"),
            service("b", "http://127.0.0.1:3001"),
        ];
        let routes = vec![
            route("long", "/api/very/specific", "a", 0),
            route("short", "/api", "b", 10),
        ];
        let table = RouteTable::from_config(&routes, &services);
        assert_eq!(table.match_path("/api/very/specific").unwrap().service, "b");
    }

    #[test]
    fn test_outbound_path_strip() {
        let services = vec![service("s", "http://127.0.0.1:3000/")];
        let routes = vec![route("r", "/api/media", "s", 0)];
        let table = RouteTable::from_config(&routes, &services);

        let matched = table.match_path("/api/media/thumb/9").unwrap();
        assert_eq!(matched.outbound_path("/api/media/thumb/9"), "/thumb/9");
        // Base URL trailing slash trimmed at compile time.
        assert_eq!(matched.base_url, "http://127.0.0.1:3000");
    }

    #[test]
    fn test_unknown_service_skipped() {
        let table = RouteTable::from_config(&[route("r", "/x", "ghost", 0)], &[]);
        assert!(table.is_empty());
    }
}
