pub mod netlify;
pub mod screenshot;
