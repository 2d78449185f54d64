use std::sync::Once;

use precept::dispatch::test::TestDispatch;
use sniff_tracing::{TracingConsumer, init_tracing};

pub use sniff_test_macro::test;

pub mod workload;

// this function is automatically run before each test by the macro sniff_test_macro::test
pub fn setup_test() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        init_tracing(TracingConsumer::Test, None);
        precept::init(&TestDispatch).expect("failed to setup precept");
    });
}
