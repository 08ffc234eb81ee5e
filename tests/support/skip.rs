/// Skip a test if AWS credentials or a test secret are not configured.
#[macro_export]
macro_rules! skip_without_aws {
    () => {
        if std::env::var("AWS_ACCESS_KEY_ID").is_err() {
            eprintln!("SKIPPED: AWS_ACCESS_KEY_ID not set");
            return;
        }
        if std::env::var("CONFIGURATIONS_TEST_SECRET_ID").is_err() {
            eprintln!(
                "SKIPPED: CONFIGURATIONS_TEST_SECRET_ID not set (set to a Secrets Manager secret id)"
            );
            return;
        }
    };
}
