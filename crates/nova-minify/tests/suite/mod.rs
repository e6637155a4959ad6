mod errors;
mod hierarchy;
mod interfaces;
mod properties;
mod seeds;
mod support;
