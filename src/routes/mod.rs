/// Router Module Index
///
/// Routes are grouped by access tier. The tiers document intent; enforcement is done
/// by the authorization gate layered over the assembled router, driven by the
/// `RouteTable` prefixes.

/// Routes reachable without a session: health, login, unauthorized, auth API.
pub mod public;

/// Routes under protected prefixes that any authenticated principal may reach.
pub mod authenticated;

/// Routes under `/admin`, restricted to the 'admin' role.
pub mod admin;
