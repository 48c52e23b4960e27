mod mocks;
mod provisioning;
mod readiness;
