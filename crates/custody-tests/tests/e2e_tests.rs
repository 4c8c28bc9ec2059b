#[path = "e2e/treasury_lifecycle.rs"]
mod treasury_lifecycle;

#[path = "e2e/reward_claims.rs"]
mod reward_claims;

#[path = "e2e/emergency_pause.rs"]
mod emergency_pause;

#[path = "e2e/role_registry.rs"]
mod role_registry;
