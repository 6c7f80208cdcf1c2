//! # Readiness Handshake
//!
//! The view greets once it has bootstrapped; the host proceeds either on the
//! greeting or, after the configured delay, without it.

#[cfg(test)]
mod tests {
    use super::super::Bridge;
    use bridge_host::{HostConfig, Readiness, ReadinessState};
    use bridge_view::CommandRegistry;
    use std::time::Duration;

    #[tokio::test]
    async fn test_greeting_completes_readiness() {
        let bridge = Bridge::connect(&HostConfig::default(), CommandRegistry::new());
        bridge.broker.arm_handshake(Duration::from_secs(5));

        bridge.view.greet("Hello from the view").await.unwrap();

        let readiness = tokio::time::timeout(
            Duration::from_secs(1),
            bridge.broker.readiness().wait(),
        )
        .await
        .unwrap();
        assert_eq!(readiness, Readiness::Greeted);
        assert!(bridge.notifier.warnings().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_greeting_is_harmless() {
        let bridge = Bridge::connect(&HostConfig::default(), CommandRegistry::new());

        bridge.view.greet("first").await.unwrap();
        bridge.view.greet("second").await.unwrap();
        assert_eq!(bridge.broker.readiness().wait().await, Readiness::Greeted);

        // The host kept serving after both greetings
        let name = bridge
            .view
            .call(bridge_types::Target::Environment, "getEnvironmentName", vec![])
            .await
            .unwrap();
        assert_eq!(name, serde_json::json!("headless"));
        assert_eq!(bridge.broker.readiness().state(), ReadinessState::Greeted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_greeting_falls_back_after_delay() {
        let bridge = Bridge::connect(&HostConfig::default(), CommandRegistry::new());
        bridge.broker.arm_handshake(Duration::from_millis(5000));

        let readiness = bridge.broker.readiness().wait().await;
        assert_eq!(readiness, Readiness::TimedOut);

        let warnings = bridge.notifier.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("did not greet within 5000ms"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_greeting_after_timeout_changes_nothing() {
        let bridge = Bridge::connect(&HostConfig::default(), CommandRegistry::new());
        bridge.broker.arm_handshake(Duration::from_millis(100));
        assert_eq!(bridge.broker.readiness().wait().await, Readiness::TimedOut);

        bridge.view.greet("late").await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(bridge.broker.readiness().state(), ReadinessState::TimedOut);
        assert_eq!(bridge.notifier.warnings().len(), 1);
    }
}
