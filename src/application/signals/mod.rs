pub mod signal_router;

pub use signal_router::{RegimeDecision, Signal, SignalRouter, SignalRouterSettings};
