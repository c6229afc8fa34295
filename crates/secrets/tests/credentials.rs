use bookmark_secrets::{
    encrypt_token, generate_key, Credentials, DecryptionError, ExposeSecret, KeyError,
    SealedCredentials, SealedSecret, SecretString,
};

fn seal(plaintext: &str, key: &SecretString) -> SealedSecret {
    let ciphertext =
        encrypt_token(&SecretString::new(plaintext.to_string()), key).expect("encrypt");
    SealedSecret::new(ciphertext, key.expose_secret().as_str())
}

#[test]
fn opens_both_secrets_with_their_own_keys() {
    let sealed = SealedCredentials {
        deploy_username: "gitlab+deploy-token-7".to_string(),
        deploy_token: seal("deploy-plain", &generate_key()),
        api_token: seal("glpat-plain", &generate_key()),
    };
    let credentials = Credentials::open(&sealed).expect("open");
    assert_eq!(credentials.deploy().username(), "gitlab+deploy-token-7");
    assert_eq!(credentials.deploy().token(), "deploy-plain");
    assert_eq!(credentials.api_token(), "glpat-plain");
}

#[test]
fn swapped_keys_name_the_failing_secret() {
    let pat_key = generate_key();
    let deploy = seal("deploy-plain", &generate_key());
    let sealed = SealedCredentials {
        deploy_username: "deployer".to_string(),
        deploy_token: SealedSecret::new(deploy.ciphertext, pat_key.expose_secret().as_str()),
        api_token: seal("glpat-plain", &pat_key),
    };
    match Credentials::open(&sealed).unwrap_err() {
        DecryptionError::Secret { name, source } => {
            assert_eq!(name, "deploy token");
            assert!(matches!(*source, DecryptionError::Authentication));
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn malformed_api_key_is_reported_as_such() {
    let sealed = SealedCredentials {
        deploy_username: "deployer".to_string(),
        deploy_token: seal("deploy-plain", &generate_key()),
        api_token: SealedSecret::new("gAAAAAB", "not a fernet key"),
    };
    match Credentials::open(&sealed).unwrap_err() {
        DecryptionError::Secret { name, source } => {
            assert_eq!(name, "personal api token");
            assert!(matches!(*source, DecryptionError::Key(KeyError::NotBase64)));
        }
        other => panic!("unexpected error {other}"),
    }
}
