// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn records_calls_in_order() {
    let fake = FakeAdminClient::new();

    fake.register("app", "http://e:9999").await.unwrap();
    fake.callback(&TaskCallback::success(1, 10, "ok")).await.unwrap();
    fake.unregister("app", "http://e:9999").await.unwrap();

    let calls = fake.calls();
    assert_eq!(calls.len(), 3);
    assert!(matches!(calls[0], AdminCall::Register { .. }));
    assert!(matches!(calls[1], AdminCall::Callback(_)));
    assert!(matches!(calls[2], AdminCall::Unregister { .. }));
    assert_eq!(fake.register_count(), 1);
    assert_eq!(fake.callbacks().len(), 1);
}

#[tokio::test]
async fn failing_mode_rejects_but_still_records() {
    let fake = FakeAdminClient::new();
    fake.set_failing(true);

    let result = fake.register("app", "http://e:9999").await;
    assert!(matches!(result, Err(AdminError::Rejected { .. })));
    assert_eq!(fake.register_count(), 1);

    fake.set_failing(false);
    fake.register("app", "http://e:9999").await.unwrap();
    assert_eq!(fake.register_count(), 2);
}
