use std::time::Duration;

use rlimit::Resource;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Truncates a string to a maximum length, adding `...` to the end if it was truncated.
///
/// This function will continuously try to reduce length if string is being
/// truncated in the middle of a UTF codepoint
///
/// # Arguments
/// * `string` - The string to truncate
/// * `max_length` - The maximum length of the string, at least 3
#[must_use]
pub fn truncate_string(string: &str, max_length: usize) -> String {
    if string.len() <= max_length {
        return string.to_string();
    }

    let mut end = max_length.saturating_sub(3);
    while !string.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}...", &string[..end])
}

/// Warns when the open file limit is too low for the amount of concurrent fetches
pub fn warn_ulimit(parallelism: usize) {
    let Ok((limit, _)) = rlimit::getrlimit(Resource::NOFILE) else {
        return;
    };

    // Leaves headroom for stdio, the output file and the runtime itself
    if limit <= (parallelism as u64).saturating_mul(2).saturating_add(32) {
        warn!(
            "Your file limit ({limit}) is low for {parallelism} parallel fetches and may cause connection errors. Consider raising it via `ulimit -n 10240` or lowering --parallelism"
        );
    }
}

/// Spawn a task that watches for CTRL + C signal and cancels a [`CancellationToken`] when caught
pub fn spawn_ct_watcher(ct: CancellationToken) {
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Caught CTRL+C signal!");
        ct.cancel();
    });
}

/// Spawn a task that cancels a [`CancellationToken`] once `deadline` has elapsed
pub fn spawn_deadline(ct: CancellationToken, deadline: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            () = ct.cancelled() => {}
            () = tokio::time::sleep(deadline) => {
                warn!("Run deadline of {deadline:?} reached");
                ct.cancel();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_strings_are_untouched() {
        assert_eq!(truncate_string("http://a/1.m3u", 20), "http://a/1.m3u");
    }

    #[test]
    fn long_strings_get_an_ellipsis() {
        assert_eq!(truncate_string("http://example.com/list.m3u", 10), "http://...");
    }

    #[test]
    fn never_splits_a_codepoint() {
        // Every character here is 3 bytes long
        assert_eq!(truncate_string("频道列表频道列表", 10), "频道...");
    }

    #[tokio::test]
    async fn deadline_cancels_the_token() {
        let ct = CancellationToken::new();
        spawn_deadline(ct.clone(), Duration::from_millis(10));
        tokio::time::timeout(Duration::from_secs(5), ct.cancelled())
            .await
            .unwrap();
    }
}
