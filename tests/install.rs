use jobshell::error::ShellError;
use jobshell::jobs::JobRegistry;
use jobshell::signals;
use std::sync::Arc;

#[test]
fn handlers_bind_to_a_single_registry() {
    let jobs = Arc::new(JobRegistry::new(4));
    signals::install(Arc::clone(&jobs)).unwrap();
    signals::install(Arc::clone(&jobs)).unwrap();

    let other = Arc::new(JobRegistry::new(4));
    assert!(matches!(
        signals::install(other),
        Err(ShellError::Resource { .. })
    ));
}
