//! Credential commands and credential resolution shared by the other commands.

use anyhow::{Context, Result, bail};
use console::style;
use dialoguer::Password;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use repolens::config::Config;
use repolens::credentials::callback::receive_callback;
use repolens::credentials::oauth::{AuthorizationHandshake, OAuthClient, OAuthConfig, Revocation};
use repolens::credentials::{CredentialMethod, CredentialProvider, is_valid_github_token};
use repolens::github::GitHubClient;
use repolens::ui::icons::{CHECK, KEY, WARN};

use super::super::{AuthCommands, Cli};

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

pub async fn cmd_auth(cli: &Cli, command: AuthCommands) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match command {
        AuthCommands::Status { oauth } => {
            let credentials = resolve_credentials(&config, oauth, cli.yes).await?;
            signed_in(&config, credentials, |credentials| {
                print_status(&config, credentials)
            })
            .await?;
        }
        AuthCommands::Login => {
            let credentials = oauth_login(&config).await?;
            signed_in(&config, credentials, |credentials| async move {
                if let Some(principal) = credentials.principal() {
                    println!(
                        "{}Browser sign-in works: authorized as {}",
                        CHECK,
                        style(&principal.login).bold()
                    );
                }
                println!(
                    "  {}",
                    style("This token is revoked as the command exits; pass --oauth to `files` or `analyze` to sign in for a run.")
                        .dim()
                );
                Ok(())
            })
            .await?;
        }
        AuthCommands::Logout { token } => {
            let token = token.trim();
            if token.is_empty() {
                bail!("Token to revoke is empty");
            }
            let client = OAuthClient::new(OAuthConfig::from_section(&config.file.github)?);
            let revocation = client
                .revoke_token(token)
                .await
                .context("Failed to revoke token")?;
            match revocation {
                Revocation::Revoked => println!("{}Token revoked", CHECK),
                Revocation::NotFound => bail!(
                    "Token not found for this OAuth app; nothing was revoked. \
                     Personal access tokens are revoked in the GitHub settings."
                ),
            }
        }
    }

    Ok(())
}

async fn print_status(config: &Config, credentials: CredentialProvider) -> Result<()> {
    let token = credentials
        .current_token()
        .context("The resolved credential is empty")?;

    let client = GitHubClient::new(&config.file.github.api_base);
    let principal = client
        .current_user(token)
        .await
        .context("GitHub rejected the credential")?;

    println!();
    println!("{}Signed in to GitHub", CHECK);
    println!("  method: {}", credentials.method());
    println!("  login:  {}", style(&principal.login).bold());
    if let Some(name) = &principal.name {
        println!("  name:   {}", name);
    }
    if let Some(email) = &principal.email {
        println!("  email:  {}", email);
    }
    println!();
    Ok(())
}

/// Pick the credential for this run.
///
/// `--oauth` runs the browser handshake. Otherwise `GITHUB_TOKEN` is used, or
/// the user is asked for a token when the terminal is interactive.
pub async fn resolve_credentials(
    config: &Config,
    oauth: bool,
    yes: bool,
) -> Result<CredentialProvider> {
    if oauth {
        return oauth_login(config).await;
    }

    let token = match &config.github_token {
        Some(token) => token.clone(),
        None if !yes && console::Term::stdout().is_term() => Password::new()
            .with_prompt(format!("{}GitHub token", KEY))
            .interact()
            .context("Failed to read token")?,
        None => bail!("No GitHub credential. Set GITHUB_TOKEN or pass --oauth."),
    };

    let token = token.trim().to_string();
    if token.is_empty() {
        bail!("GitHub token is empty");
    }
    if !is_valid_github_token(&token) {
        warn!("token does not use a known GitHub prefix; trying it anyway");
        eprintln!(
            "{}{}",
            WARN,
            style("Token does not look like a GitHub token (ghp_, github_pat_, ...)").yellow()
        );
    }
    Ok(CredentialProvider::static_token(token))
}

/// Run the authorization-code handshake through the browser.
pub async fn oauth_login(config: &Config) -> Result<CredentialProvider> {
    let oauth = OAuthConfig::from_section(&config.file.github)?;
    let redirect_uri = oauth.redirect_uri.clone();
    let handshake = AuthorizationHandshake::begin(&oauth)?;
    let client = OAuthClient::new(oauth);

    println!("Opening the browser to authorize repolens...");
    if open::that(handshake.authorization_url()).is_err() {
        println!("Open this URL to continue:");
    }
    println!("  {}", style(handshake.authorization_url()).underlined());

    let callback_url = receive_callback(&redirect_uri, CALLBACK_TIMEOUT)
        .await
        .context("Did not receive the authorization callback")?;
    let credentials = client
        .complete(&handshake, &callback_url)
        .await
        .context("Authorization failed")?;

    if let Some(principal) = credentials.principal() {
        info!(login = %principal.login, "oauth session established");
    }
    Ok(credentials)
}

/// Run `work` under `credentials`, then sign out whether or not it succeeded.
pub async fn signed_in<T, F, Fut>(
    config: &Config,
    credentials: CredentialProvider,
    work: F,
) -> Result<T>
where
    F: FnOnce(CredentialProvider) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let outcome = work(credentials.clone()).await;
    sign_out(config, credentials).await;
    outcome
}

/// End an authorized session by revoking its token. Best effort.
pub async fn sign_out(config: &Config, credentials: CredentialProvider) {
    if credentials.method() != CredentialMethod::AuthorizedSession {
        return;
    }
    let Some(token) = credentials.current_token() else {
        return;
    };
    match OAuthConfig::from_section(&config.file.github) {
        Ok(oauth) => match OAuthClient::new(oauth).revoke_token(token).await {
            Ok(Revocation::Revoked) => debug!("oauth token revoked"),
            Ok(Revocation::NotFound) => warn!("oauth token was already gone when signing out"),
            Err(e) => warn!(error = %e, "failed to revoke oauth token"),
        },
        Err(e) => warn!(error = %e, "cannot revoke oauth token"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repolens::config::RepolensToml;
    use repolens::credentials::Principal;
    use repolens::github::{ForgeClient, RepoContext};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> Config {
        let mut file = RepolensToml::default();
        file.github.api_base = server.uri();
        file.github.oauth_base = server.uri();
        file.github.client_id = Some("client-123".to_string());
        file.github.client_secret = Some("secret-456".to_string());
        Config {
            file,
            github_token: None,
            analyzer_key: None,
        }
    }

    fn authorized() -> CredentialProvider {
        CredentialProvider::authorized(
            "gho_session",
            Principal {
                login: "octocat".to_string(),
                id: 1,
                name: None,
                email: None,
            },
        )
    }

    async fn list_demo(config: &Config, credentials: CredentialProvider) -> Result<usize> {
        let token = credentials
            .current_token()
            .context("The resolved credential is empty")?;
        let files = GitHubClient::new(&config.file.github.api_base)
            .list_files(&RepoContext::new("octo", "demo", "main"), token)
            .await?;
        Ok(files.len())
    }

    async fn mount_missing_branch(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/branches/main"))
            .respond_with(ResponseTemplate::new(404))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_failed_listing_still_revokes_session_token() {
        let server = MockServer::start().await;
        mount_missing_branch(&server).await;
        Mock::given(method("DELETE"))
            .and(path("/applications/client-123/token"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let config = config_for(&server);
        let result = signed_in(&config, authorized(), |credentials| {
            list_demo(&config, credentials)
        })
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_successful_work_revokes_session_token() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/applications/client-123/token"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let config = config_for(&server);
        let login = signed_in(&config, authorized(), |credentials| async move {
            Ok(credentials.principal().map(|p| p.login.clone()))
        })
        .await
        .unwrap();

        assert_eq!(login.as_deref(), Some("octocat"));
    }

    #[tokio::test]
    async fn test_static_token_is_never_revoked() {
        let server = MockServer::start().await;
        mount_missing_branch(&server).await;
        Mock::given(method("DELETE"))
            .and(path("/applications/client-123/token"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let config = config_for(&server);
        let result = signed_in(
            &config,
            CredentialProvider::static_token("ghp_personal"),
            |credentials| list_demo(&config, credentials),
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_sign_out_tolerates_unknown_token() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/applications/client-123/token"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        sign_out(&config_for(&server), authorized()).await;
    }
}
