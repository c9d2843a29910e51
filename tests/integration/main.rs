//! End-to-end tests of the decision pipeline against a scripted oracle.

mod pipeline;
mod stub_oracle;
