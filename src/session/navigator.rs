//! Redirect-on-expiry policy

use colored::Colorize;

/// Login entry point
pub const LOGIN_ROUTE: &str = "/login";

/// Routes reachable without a session; never redirected away from
pub const PUBLIC_ROUTES: &[&str] = &["/login", "/register"];

/// Check whether a route is public
pub fn is_public_route(route: &str) -> bool {
    PUBLIC_ROUTES.contains(&route)
}

/// Navigation mechanism the session manager hands control to after a
/// terminal refresh failure.
pub trait Navigator: Send + Sync {
    /// Route the user is currently on
    fn current_route(&self) -> String;

    /// Send the user to another route
    fn redirect(&self, route: &str);
}

/// Navigator for the command line.
///
/// Each command maps onto a route; "redirecting" to the login route means
/// telling the user how to sign in again.
#[derive(Debug, Clone)]
pub struct CliNavigator {
    route: String,
}

impl CliNavigator {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
        }
    }
}

impl Navigator for CliNavigator {
    fn current_route(&self) -> String {
        self.route.clone()
    }

    fn redirect(&self, route: &str) {
        if route == LOGIN_ROUTE {
            eprintln!(
                "{} Your session has expired. Run {} to sign in again.",
                "⚠".yellow(),
                "boinchub login".cyan()
            );
        } else {
            log::debug!("Redirect to {} ignored on the command line", route);
        }
    }
}
