// src/services/auth.rs

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{AuthResponse, Claims, User},
};

/// Gera o hash bcrypt fora do executor assíncrono.
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hash de senha: {}", e))??;
    Ok(hashed)
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    token_ttl_hours: i64,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String, token_ttl_hours: i64) -> Self {
        Self { user_repo, jwt_secret, token_ttl_hours }
    }

    pub async fn login_user(&self, username: &str, password: &str) -> Result<AuthResponse, AppError> {
        let user = self
            .user_repo
            .find_by_username(username.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        // Só depois da senha: não revela quais contas existem
        if !user.active {
            return Err(AppError::InactiveAccount);
        }

        let token = self.create_token(&user)?;
        tracing::info!("Login de {} ({:?})", user.username, user.role);
        Ok(AuthResponse { token, user })
    }

    /// Invalida todos os tokens emitidos para o usuário.
    pub async fn logout(&self, user: &User) -> Result<(), AppError> {
        self.user_repo.bump_session_version(user.id).await?;
        tracing::info!("Logout de {}", user.username);
        Ok(())
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = self.decode_token(token)?;

        let user = self
            .user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        // Token anterior ao último logout ou à última (des)ativação
        if user.session_version != claims.ver {
            return Err(AppError::InvalidToken);
        }
        if !user.active {
            return Err(AppError::InactiveAccount);
        }
        Ok(user)
    }

    pub fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;
        Ok(token_data.claims)
    }

    pub fn create_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::hours(self.token_ttl_hours);

        let claims = Claims {
            sub: user.id,
            ver: user.session_version,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        // Usa '?' para um tratamento de erro mais limpo
        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{auth::sample_user, rbac::Role};
    use sqlx::postgres::PgPoolOptions;

    fn service(secret: &str, ttl_hours: i64) -> AuthService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/rutas_test")
            .expect("URL válida");
        AuthService::new(UserRepository::new(pool), secret.to_string(), ttl_hours)
    }

    #[tokio::test]
    async fn token_carries_user_and_session_version() {
        let auth = service("segredo", 1);
        let mut user = sample_user(Role::Salesperson);
        user.session_version = 7;

        let token = auth.create_token(&user).unwrap();
        let claims = auth.decode_token(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.ver, 7);
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_rejected() {
        let token = service("segredo-a", 1).create_token(&sample_user(Role::Admin)).unwrap();
        assert!(matches!(service("segredo-b", 1).decode_token(&token), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let auth = service("segredo", -2);
        let token = auth.create_token(&sample_user(Role::Admin)).unwrap();
        assert!(matches!(auth.decode_token(&token), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn password_hash_verifies() {
        let hashed = hash_password("secreto1").await.unwrap();
        assert!(verify("secreto1", &hashed).unwrap());
        assert!(!verify("outro", &hashed).unwrap());
    }
}
