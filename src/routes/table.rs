use std::collections::BTreeMap;

use axum::handler::Handler;
use axum::http::Method;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{self, MethodRouter};
use axum::Router;

use crate::auth::guards;
use crate::routes::params::{self, POST_PARAM, USER_PARAM};
use crate::state::AppState;

/// Checks that can sit in front of a handler. They run in the order given,
/// after the path-parameter resolvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    RequireSignin,
    HasAuthorization,
    IsPoster,
}

struct Entry {
    method: Method,
    path: String,
    guards: Vec<Guard>,
    handler: MethodRouter<AppState>,
}

/// Route registrations collected before the router is built. Registering the
/// same method and path again replaces the earlier binding, guards included.
#[derive(Default)]
pub struct RouteTable {
    entries: Vec<Entry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<H, T>(&mut self, path: &str, guards: &[Guard], handler: H) -> &mut Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.add(Method::GET, path, guards, routing::get(handler))
    }

    pub fn post<H, T>(&mut self, path: &str, guards: &[Guard], handler: H) -> &mut Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.add(Method::POST, path, guards, routing::post(handler))
    }

    pub fn put<H, T>(&mut self, path: &str, guards: &[Guard], handler: H) -> &mut Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.add(Method::PUT, path, guards, routing::put(handler))
    }

    pub fn delete<H, T>(&mut self, path: &str, guards: &[Guard], handler: H) -> &mut Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.add(Method::DELETE, path, guards, routing::delete(handler))
    }

    fn add(
        &mut self,
        method: Method,
        path: &str,
        guards: &[Guard],
        handler: MethodRouter<AppState>,
    ) -> &mut Self {
        let entry = Entry {
            method,
            path: path.to_string(),
            guards: guards.to_vec(),
            handler,
        };

        match self
            .entries
            .iter_mut()
            .find(|e| e.method == entry.method && e.path == entry.path)
        {
            Some(existing) => {
                tracing::warn!(
                    method = %entry.method,
                    path = %entry.path,
                    replaced_guards = ?existing.guards,
                    guards = ?entry.guards,
                    "Route registered twice; the later registration wins"
                );
                *existing = entry;
            }
            None => self.entries.push(entry),
        }
        self
    }

    /// Guards bound to a route, or `None` when nothing is registered for it.
    #[cfg(test)]
    fn guards_for(&self, method: &Method, path: &str) -> Option<&[Guard]> {
        self.entries
            .iter()
            .find(|e| e.method == *method && e.path == path)
            .map(|e| e.guards.as_slice())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn into_router(self, state: &AppState) -> Router<AppState> {
        let mut by_path: BTreeMap<String, Vec<MethodRouter<AppState>>> = BTreeMap::new();
        for entry in self.entries {
            let path = entry.path.clone();
            by_path.entry(path).or_default().push(entry.layered(state));
        }

        by_path
            .into_iter()
            .fold(Router::new(), |router, (path, handlers)| {
                match handlers.into_iter().reduce(MethodRouter::merge) {
                    Some(handler) => router.route(&path, handler),
                    None => router,
                }
            })
    }
}

impl Entry {
    // route_layer wraps, so the last layer applied runs first: guards go on
    // in reverse, then the resolvers on the outside.
    fn layered(self, state: &AppState) -> MethodRouter<AppState> {
        let mut handler = self.handler;
        for guard in self.guards.iter().rev() {
            handler = match guard {
                Guard::RequireSignin => {
                    handler.route_layer(from_fn_with_state(state.clone(), guards::require_signin))
                }
                Guard::HasAuthorization => handler.route_layer(from_fn(guards::has_authorization)),
                Guard::IsPoster => handler.route_layer(from_fn(guards::is_poster)),
            };
        }

        if names_param(&self.path, POST_PARAM) {
            handler = handler.route_layer(from_fn_with_state(state.clone(), params::resolve_post));
        }
        if names_param(&self.path, USER_PARAM) {
            handler = handler.route_layer(from_fn_with_state(state.clone(), params::resolve_user));
        }
        handler
    }
}

fn names_param(path: &str, name: &str) -> bool {
    path.split('/')
        .any(|segment| segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) == Some(name))
}
