//! Custom assertion helpers.

use ac_core::controller::Response;
use ac_core::sink::MemoryEventSink;
use ac_protocol::View;

/// Assert the lifecycle events recorded so far, ignoring step events.
#[allow(dead_code)]
pub fn assert_lifecycle(sink: &MemoryEventSink, expected: &[&str]) {
    let lifecycle: Vec<String> = sink
        .kinds()
        .into_iter()
        .filter(|kind| kind.starts_with("chain:"))
        .collect();
    assert_eq!(lifecycle, expected, "unexpected lifecycle events");
}

/// Unwrap a view response, checking its template and status.
#[allow(dead_code)]
pub fn assert_view(response: &Response, template: &str, status: u16) -> View {
    match response {
        Response::View(view) => {
            assert_eq!(view.template, template, "unexpected template in {view:?}");
            assert_eq!(view.status, status, "unexpected status in {view:?}");
            view.clone()
        }
        Response::Redirect(url) => panic!("expected view {template}, got redirect to {url}"),
    }
}

/// Unwrap a redirect response.
#[allow(dead_code)]
pub fn assert_redirect(response: &Response) -> String {
    match response {
        Response::Redirect(url) => url.clone(),
        Response::View(view) => panic!("expected redirect, got {view:?}"),
    }
}
