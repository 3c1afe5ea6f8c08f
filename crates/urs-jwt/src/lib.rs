//! OAuth2 login against NASA's Earthdata Login (URS) for axum applications.
//!
//! After a successful authorization-code exchange the user's profile is
//! signed into a short-lived bearer token that protected routes can verify
//! locally, without a session store and without calling URS again.
//!
//! ```ignore
//! let urs = Urs::new(load_config()?)?;
//! let app = Router::new()
//!     .route("/me", get(me))
//!     .route_layer(middleware::from_fn_with_state(urs.jwt_required(None), require_jwt::<Payload>))
//!     .merge(urs.router());
//! ```

pub mod callback;
pub mod config;
pub mod error;
pub mod guard;
pub mod hooks;
pub mod provider;
pub mod state;
pub mod token;

pub use config::{AppConfig, ConfigError, JwtConfig, UrsConfig, load_config};
pub use error::{AuthError, CallbackError, ErrorBody, ProviderError, TokenError};
pub use guard::{CurrentUser, Guard, require_jwt};
pub use provider::{AccessGrant, Profile, ProviderClient};
pub use state::{Urs, UrsBuilder};
pub use token::{Payload, TokenCodec};
