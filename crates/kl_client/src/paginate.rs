//! Pagination helper.
//!
//! Drives repeated list calls until the backing store reports no
//! continuation token. The literal string `"null"` is a backend quirk for
//! "no more pages" and is normalised to absence, never passed back as a
//! token. A failed page fetch aborts the whole accumulation — partial
//! results are never returned.

use std::future::Future;

use kl_proto::api::{normalize_token, ListOptions, Page};

use crate::error::Result;

pub async fn paginate<T, F, Fut>(mut fetch: F, options: ListOptions) -> Result<Vec<T>>
where
    F: FnMut(ListOptions) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut token = normalize_token(options.next_token.as_deref());
    let limit = options.limit;

    loop {
        let page = fetch(ListOptions { next_token: token.clone(), limit }).await?;
        let next = page.continuation();
        items.extend(page.items);
        match next {
            Some(t) => token = Some(t),
            None => break,
        }
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn page(items: Vec<u32>, token: Option<&str>) -> Page<u32> {
        Page { items, next_token: token.map(str::to_string) }
    }

    #[tokio::test]
    async fn accumulates_until_null_sentinel() {
        let calls = AtomicUsize::new(0);
        let items = paginate(
            |_opts| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    Ok(match n {
                        0 => page(vec![1], Some("t1")),
                        1 => page(vec![2], Some("t2")),
                        2 => page(vec![3], Some("null")),
                        _ => panic!("fetched past the sentinel"),
                    })
                }
            },
            ListOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn single_call_when_no_token() {
        let calls = AtomicUsize::new(0);
        let items = paginate(
            |_opts| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(page(vec![7, 8], None)) }
            },
            ListOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(items, vec![7, 8]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn token_is_threaded_through() {
        let calls = AtomicUsize::new(0);
        paginate(
            |opts| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    match n {
                        0 => {
                            assert_eq!(opts.next_token, None);
                            Ok(page(vec![], Some("t1")))
                        }
                        _ => {
                            assert_eq!(opts.next_token.as_deref(), Some("t1"));
                            Ok(page(vec![], None))
                        }
                    }
                }
            },
            ListOptions::default(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn page_failure_aborts_accumulation() {
        let calls = AtomicUsize::new(0);
        let result: Result<Vec<u32>> = paginate(
            |_opts| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    match n {
                        0 => Ok(page(vec![1], Some("t1"))),
                        _ => Err(Error::TooManyRequests),
                    }
                }
            },
            ListOptions::default(),
        )
        .await;

        assert!(matches!(result, Err(Error::TooManyRequests)));
    }
}
