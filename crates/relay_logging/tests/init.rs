use relay_logging::{relay_debug, relay_info, LogDestination, DEFAULT_LOG_FILE};

#[test]
fn test_initializer_is_idempotent() {
    relay_logging::initialize_for_tests();
    relay_logging::initialize_for_tests();
    relay_info!("logger initialised twice without panicking");
    relay_debug!("generation {}", 1);
}

#[test]
fn default_file_destination_points_at_relay_log() {
    assert_eq!(
        LogDestination::default_file(),
        LogDestination::File(DEFAULT_LOG_FILE.into())
    );
}
