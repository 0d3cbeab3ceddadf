// TabHost services
// Stateless helpers: the state codec and the profile-directory file store.

pub mod state_codec;
pub mod state_store;
