//! # Integration Test Flows
//!
//! Tests that the handshake, the correlator and the token cache work
//! together through one `PluginBridge` and one inbound stream.
//!
//! ## Flows Tested:
//!
//! 1. **connect → ready → getUser**: the canonical request/reply round trip
//! 2. **Send before ready**: requests are held until the handshake completes
//! 3. **Listener hand-off**: bootstrap and steady-state slots never overlap
//! 4. **Token refresh**: host pushes replace the cached token
//! 5. **Façade**: intents, toasts and direct remote calls

#[cfg(test)]
mod tests {
    use crate::harness::{
        bridge_pair, connected_bridge, eventually, test_config, CannedRemoteApi, FAR_FUTURE_MS,
    };
    use plugin_bridge::{
        BridgeError, HandshakeState, ListenerSlot, PluginApi, PluginIntent, RequestId, Toast,
    };
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    // =============================================================================
    // HANDSHAKE AND CORRELATION
    // =============================================================================

    /// connect, handshake reply, then one getUser round trip
    #[tokio::test]
    async fn test_connect_then_get_user() {
        let (bridge, mut host) = bridge_pair(test_config(), None, Arc::default());

        bridge.init().await.unwrap();
        host.expect_connect().await;
        host.deliver(
            r#"{"requestID":"x","response":{"event":"connect","success":true,"data":{"token":"abc","expires":4102444800000}}}"#,
        );
        bridge
            .wait_until_ready(Some(Duration::from_secs(2)))
            .await
            .unwrap();

        assert!(bridge.is_ready());
        assert_eq!(bridge.current_token().unwrap().token, "abc");

        let call = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.send_request("getUser", json!({"userid": "42"})).await })
        };

        let request = host.next_request().await;
        assert_eq!(request.event, "getUser");
        assert_eq!(request.body, json!({"userid": "42"}));
        let request_id = RequestId::from(request.request_id.as_str());
        assert!(bridge.is_pending(&request_id));

        host.reply(&request, true, json!({"id": "42"}));

        let reply = call.await.unwrap().unwrap();
        assert!(reply.success);
        assert_eq!(reply.data["id"], "42");
        assert!(!bridge.is_pending(&request_id));
        assert_eq!(bridge.pending_count(), 0);
    }

    /// Requests issued before the handshake are sent only after it
    #[tokio::test]
    async fn test_send_before_ready_is_queued() {
        let (bridge, mut host) = bridge_pair(test_config(), None, Arc::default());
        bridge.init().await.unwrap();
        host.expect_connect().await;

        let calls: Vec<_> = (0..3)
            .map(|n| {
                let bridge = bridge.clone();
                tokio::spawn(async move { bridge.send_request("getCourse", json!({"n": n})).await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(host.is_quiet());
        assert_eq!(bridge.pending_count(), 0);

        host.complete_handshake("abc");

        for _ in 0..3 {
            let request = host.next_request().await;
            assert!(bridge.is_ready());
            let n = request.body["n"].clone();
            host.reply(&request, true, json!({"n": n}));
        }

        for (n, call) in calls.into_iter().enumerate() {
            let reply = call.await.unwrap().unwrap();
            assert_eq!(reply.data["n"], json!(n));
        }
    }

    /// Replies may arrive in any order
    #[tokio::test]
    async fn test_out_of_order_replies() {
        let (bridge, mut host) = connected_bridge("abc", Arc::default()).await;

        let first = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.send_request("getUser", json!({"userid": "1"})).await })
        };
        let first_request = host.next_request().await;
        let second = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.send_request("getUser", json!({"userid": "2"})).await })
        };
        let second_request = host.next_request().await;
        assert_ne!(first_request.request_id, second_request.request_id);

        host.reply(&second_request, true, json!({"id": "2"}));
        host.reply(&first_request, true, json!({"id": "1"}));

        assert_eq!(first.await.unwrap().unwrap().data["id"], "1");
        assert_eq!(second.await.unwrap().unwrap().data["id"], "2");
    }

    /// Duplicate and unknown replies are dropped without side effects
    #[tokio::test]
    async fn test_duplicate_reply_is_dropped() {
        let (bridge, mut host) = connected_bridge("abc", Arc::default()).await;

        let call = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.send_request("getUser", json!({})).await })
        };
        let request = host.next_request().await;

        host.reply(&request, true, json!({"id": "first"}));
        host.reply(&request, true, json!({"id": "second"}));
        host.reply_to("nobody", "getUser", true, json!({}));
        host.deliver("definitely not json");

        assert_eq!(call.await.unwrap().unwrap().data["id"], "first");
        eventually(|| bridge.listener_stats().steady_messages.load(Ordering::Relaxed) == 4).await;

        let stats = bridge.correlator_stats();
        assert_eq!(stats.unmatched.load(Ordering::Relaxed), 2);
        assert_eq!(stats.malformed.load(Ordering::Relaxed), 1);
        assert_eq!(bridge.pending_stats().total_completed.load(Ordering::Relaxed), 1);
    }

    /// A second handshake-completion payload is a no-op
    #[tokio::test]
    async fn test_handshake_idempotence() {
        let (bridge, mut host) = bridge_pair(test_config(), None, Arc::default());
        bridge.init().await.unwrap();
        host.expect_connect().await;

        host.complete_handshake("first");
        host.complete_handshake("second");

        eventually(|| bridge.listener_stats().total_messages() == 2).await;
        assert_eq!(bridge.ready_transitions(), 1);
        assert_eq!(bridge.current_token().unwrap().token, "first");
    }

    /// Payloads before completion reach only the bootstrap slot, payloads
    /// after it only the steady-state slot
    #[tokio::test]
    async fn test_listener_hand_off() {
        let (bridge, mut host) = bridge_pair(test_config(), None, Arc::default());
        bridge.init().await.unwrap();
        host.expect_connect().await;
        assert_eq!(bridge.listener_stats().active_slot(), ListenerSlot::Bootstrap);

        host.deliver("garbage");
        host.reply_to("early", "connect", false, json!(null));
        host.complete_handshake("abc");
        host.reply_to("late-1", "getUser", true, json!({}));
        host.reply_to("late-2", "getUser", true, json!({}));

        eventually(|| bridge.listener_stats().total_messages() == 5).await;

        let stats = bridge.listener_stats();
        assert_eq!(stats.bootstrap_messages.load(Ordering::Relaxed), 3);
        assert_eq!(stats.steady_messages.load(Ordering::Relaxed), 2);
        assert_eq!(stats.handoffs.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_slot(), ListenerSlot::SteadyState);
        assert_eq!(bridge.correlator_stats().unmatched.load(Ordering::Relaxed), 2);
    }

    /// Tokenless handshake replies keep the bridge connecting
    #[tokio::test]
    async fn test_tokenless_handshake_stays_connecting() {
        let (bridge, mut host) = bridge_pair(test_config(), None, Arc::default());
        bridge.init().await.unwrap();
        host.expect_connect().await;

        host.reply_to("x", "connect", true, json!(null));
        eventually(|| bridge.listener_stats().bootstrap_messages.load(Ordering::Relaxed) == 1).await;

        assert_eq!(bridge.handshake_state(), HandshakeState::Connecting);
        let waited = bridge
            .wait_until_ready(Some(Duration::from_millis(20)))
            .await;
        assert!(matches!(waited, Err(BridgeError::Timeout { what: "handshake", .. })));
    }

    // =============================================================================
    // TOKEN REFRESH
    // =============================================================================

    /// A refresh applies even though its requestID matches nothing
    #[tokio::test]
    async fn test_refresh_without_matching_request() {
        let (bridge, host) = connected_bridge("abc", Arc::default()).await;

        host.push_token("unrelated", "rotated", FAR_FUTURE_MS);
        eventually(|| bridge.current_token().is_some_and(|t| t.token == "rotated")).await;
        assert_eq!(bridge.correlator_stats().refreshes.load(Ordering::Relaxed), 1);
    }

    /// A refresh that also answers a pending request does both
    #[tokio::test]
    async fn test_refresh_that_matches_a_request() {
        let (bridge, mut host) = connected_bridge("abc", Arc::default()).await;

        let call = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.send_request("token", json!({})).await })
        };
        let request = host.next_request().await;
        host.push_token(&request.request_id, "renewed", FAR_FUTURE_MS);

        let reply = call.await.unwrap().unwrap();
        assert_eq!(reply.data["token"], "renewed");
        eventually(|| bridge.current_token().is_some_and(|t| t.token == "renewed")).await;
    }

    /// Empty refresh payloads leave the token alone
    #[tokio::test]
    async fn test_empty_refresh_is_ignored() {
        let (bridge, host) = connected_bridge("abc", Arc::default()).await;

        host.reply_to("r", "token", true, json!({}));
        host.reply_to("r", "token", true, json!(null));
        eventually(|| bridge.listener_stats().steady_messages.load(Ordering::Relaxed) == 2).await;

        assert_eq!(bridge.current_token().unwrap().token, "abc");
        assert_eq!(bridge.correlator_stats().refreshes.load(Ordering::Relaxed), 0);
    }

    // =============================================================================
    // TIMEOUTS AND LIFECYCLE
    // =============================================================================

    #[tokio::test]
    async fn test_request_timeout_withdraws_request() {
        let config = test_config().with_request_timeout(Duration::from_millis(20));
        let (bridge, mut host) = bridge_pair(config, None, Arc::default());
        bridge.init().await.unwrap();
        host.expect_connect().await;
        host.complete_handshake("abc");

        let result = bridge.send_request("getUser", json!({})).await;
        assert!(matches!(result, Err(BridgeError::Timeout { what: "reply", .. })));
        assert_eq!(bridge.pending_count(), 0);

        // The late reply finds nothing to complete
        let request = host.next_request().await;
        host.reply(&request, true, json!({}));
        eventually(|| bridge.correlator_stats().unmatched.load(Ordering::Relaxed) == 1).await;
    }

    #[tokio::test]
    async fn test_ready_timeout() {
        let config = test_config().with_ready_timeout(Duration::from_millis(20));
        let (bridge, mut host) = bridge_pair(config, None, Arc::default());
        bridge.init().await.unwrap();
        host.expect_connect().await;

        let result = bridge.send_request("getUser", json!({})).await;
        assert!(matches!(result, Err(BridgeError::Timeout { what: "handshake", .. })));
        assert!(host.is_quiet());
    }

    #[tokio::test]
    async fn test_dispose_detaches_listener() {
        let (bridge, host) = connected_bridge("abc", Arc::default()).await;
        assert_eq!(host.subscriber_count(), 1);

        bridge.dispose().await.unwrap();
        assert_eq!(host.subscriber_count(), 0);
        assert_eq!(host.deliver(r#"{"requestID":"x","response":{"event":"getUser"}}"#), 0);

        bridge.init().await.unwrap();
        assert_eq!(host.subscriber_count(), 1);
        assert!(bridge.is_ready());
    }

    #[tokio::test]
    async fn test_missing_host_never_becomes_ready() {
        let channel = plugin_bridge::MemoryChannel::detached();
        let bridge = plugin_bridge::PluginBridge::with_channel(test_config(), channel)
            .remote_api(Arc::new(CannedRemoteApi::default()))
            .build()
            .unwrap();

        bridge.init().await.unwrap();
        let waited = bridge
            .wait_until_ready(Some(Duration::from_millis(20)))
            .await;
        assert!(waited.is_err());
        assert_eq!(bridge.handshake_state(), HandshakeState::Connecting);
    }

    // =============================================================================
    // FAÇADE
    // =============================================================================

    #[tokio::test]
    async fn test_request_intents_grants_new_token() {
        let (bridge, mut host) = connected_bridge("abc", Arc::default()).await;

        let call = {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                bridge
                    .request_intents(&[PluginIntent::GetSelf, PluginIntent::GetLmsLinkedSelf])
                    .await
            })
        };
        let request = host.next_request().await;
        assert_eq!(request.event, "requestIntents");
        assert_eq!(request.body, json!({"intents": ["getSelf", "getLMSLinkedSelf"]}));
        host.reply(
            &request,
            true,
            json!({"token": "scoped", "expires": FAR_FUTURE_MS}),
        );

        assert!(call.await.unwrap());
        assert_eq!(bridge.current_token().unwrap().token, "scoped");
    }

    #[tokio::test]
    async fn test_request_intents_denied() {
        let (bridge, mut host) = connected_bridge("abc", Arc::default()).await;

        let call = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.request_intents(&[PluginIntent::GetUsers]).await })
        };
        let request = host.next_request().await;
        host.reply(&request, false, json!(null));

        assert!(!call.await.unwrap());
        assert_eq!(bridge.current_token().unwrap().token, "abc");
    }

    #[tokio::test]
    async fn test_send_toast_reports_success_flag() {
        let (bridge, mut host) = connected_bridge("abc", Arc::default()).await;

        for success in [true, false] {
            let call = {
                let bridge = bridge.clone();
                tokio::spawn(async move { bridge.send_toast(&Toast::new("Hello")).await })
            };
            let request = host.next_request().await;
            assert_eq!(request.event, "sendToast");
            assert_eq!(request.body["title"], "Hello");
            host.reply(&request, success, json!(null));
            assert_eq!(call.await.unwrap(), success);
        }
    }

    #[tokio::test]
    async fn test_direct_calls_use_token_where_required() {
        let remote = Arc::new(
            CannedRemoteApi::default()
                .with("https://api.example.test/user/@me", json!({"id": "me"}))
                .with("https://api.example.test/user/7", json!({"id": "7", "username": "grace"}))
                .with("https://api.example.test/community/c9", json!({"id": "c9", "name": "Physics"}))
                .with(
                    "https://api.example.test/community/c9/LMS/@me",
                    json!({"id": "lms-1", "grade": 11}),
                ),
        );
        let (bridge, _host) = connected_bridge("abc", remote.clone()).await;

        assert_eq!(bridge.get_self().await.unwrap().id.as_deref(), Some("me"));
        assert_eq!(
            bridge.get_user("7").await.unwrap().username.as_deref(),
            Some("grace")
        );
        assert_eq!(
            bridge.get_community("c9").await.unwrap().name.as_deref(),
            Some("Physics")
        );
        let lms = bridge.get_lms_self("c9").await.unwrap();
        assert_eq!(lms.id.as_deref(), Some("lms-1"));
        assert_eq!(lms.extra["grade"], 11);

        let auth: Vec<_> = remote.calls().into_iter().map(|(_, auth)| auth).collect();
        assert_eq!(
            auth,
            vec![
                Some("Plugin abc".to_string()),
                None,
                None,
                Some("Plugin abc".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_direct_call_failure_is_absent() {
        let remote = Arc::new(
            CannedRemoteApi::default().with("https://api.example.test/user/bad", json!([1, 2, 3])),
        );
        let (bridge, _host) = connected_bridge("abc", remote).await;

        assert!(bridge.get_user("missing").await.is_none());
        assert!(bridge.get_user("bad").await.is_none());
        assert!(bridge.get_community("missing").await.is_none());
    }
}
