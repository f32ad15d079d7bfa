mod common;
mod provisioning;
