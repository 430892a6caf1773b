use super::error::*;
use super::form::MultipartForm;
use bytes::Bytes;
use crate::application_port::*;
use crate::domain_model::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::multipart::FormData;
use warp::reject;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiFailure>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(failure: &ApiFailure) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(failure.clone()),
        }
    }
}

fn reply<T: Serialize>(status: StatusCode, data: T) -> impl warp::Reply {
    warp::reply::with_status(warp::reply::json(&ApiResponse::ok(data)), status)
}

async fn read_form(form: FormData, max_file_size: u64) -> Result<MultipartForm, warp::Rejection> {
    MultipartForm::read(form, max_file_size)
        .await
        .map_err(reject::custom)
}

// region auth

pub async fn register(
    form: FormData,
    max_file_size: u64,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut form = read_form(form, max_file_size).await?;
    let input = RegisterInput {
        first_name: form.text_or_empty("firstName"),
        last_name: form.text_or_empty("lastName"),
        email: form.text_or_empty("email"),
        phone: form.text_or_empty("phone"),
        password: form.text_or_empty("password"),
        date_of_birth: form.text_or_empty("dateOfBirth"),
        preferences: form.text("preferences"),
        image: form.take_image(),
    };

    let result = auth_service
        .register(input)
        .await
        .map_err(ApiFailure::from)
        .map_err(reject::custom)?;

    Ok(reply(StatusCode::CREATED, result))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

pub async fn login(
    body: LoginRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let input = LoginInput {
        identifier: body.identifier,
        password: body.password,
    };
    let result = auth_service
        .login(input)
        .await
        .map_err(ApiFailure::from)
        .map_err(reject::custom)?;

    Ok(reply(StatusCode::OK, result))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// An empty or unreadable body counts as a missing token.
pub async fn refresh(
    body: Bytes,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let request: RefreshRequest = serde_json::from_slice(&body).unwrap_or_default();
    let token = request
        .refresh_token
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)
        .map_err(ApiFailure::from)
        .map_err(reject::custom)?;

    let tokens = auth_service
        .refresh_token(&token)
        .await
        .map_err(ApiFailure::from)
        .map_err(reject::custom)?;

    Ok(reply(StatusCode::OK, tokens))
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub async fn logout(
    user_id: UserId,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    auth_service
        .logout(user_id)
        .await
        .map_err(ApiFailure::from)
        .map_err(reject::custom)?;

    Ok(reply(
        StatusCode::OK,
        MessageResponse {
            message: "Logged out successfully",
        },
    ))
}

// endregion

// region user

pub async fn get_profile(
    user_id: UserId,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let profile = user_service
        .get_profile(user_id)
        .await
        .map_err(ApiFailure::from)
        .map_err(reject::custom)?;

    Ok(reply(StatusCode::OK, profile))
}

pub async fn get_user_profile(
    id: UserId,
    _viewer: UserId,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    get_profile(id, user_service).await
}

pub async fn update_profile(
    user_id: UserId,
    form: FormData,
    max_file_size: u64,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut form = read_form(form, max_file_size).await?;
    let update = ProfileUpdate {
        first_name: form.text("firstName"),
        last_name: form.text("lastName"),
        email: form.text("email"),
        phone: form.text("phone"),
        preferences: form.text("preferences"),
        current_password: form.text("currentPassword"),
        new_password: form.text("newPassword"),
        image: form.take_image(),
    };

    let profile = user_service
        .update_profile(user_id, update)
        .await
        .map_err(ApiFailure::from)
        .map_err(reject::custom)?;

    Ok(reply(StatusCode::OK, profile))
}

pub async fn get_user_articles(
    author: UserId,
    page: Page,
    _viewer: UserId,
    article_service: Arc<dyn ArticleService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let articles = article_service
        .list_by_author(author, page)
        .await
        .map_err(ApiFailure::from)
        .map_err(reject::custom)?;

    Ok(reply(StatusCode::OK, articles))
}

// endregion

// region articles

pub async fn create_article(
    user_id: UserId,
    form: FormData,
    max_file_size: u64,
    article_service: Arc<dyn ArticleService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut form = read_form(form, max_file_size).await?;
    let input = NewArticle {
        title: form.text_or_empty("title"),
        description: form.text_or_empty("description"),
        category: form.text_or_empty("category"),
        tags: form.text("tags"),
        image: form.take_image(),
    };

    let article = article_service
        .create(user_id, input)
        .await
        .map_err(ApiFailure::from)
        .map_err(reject::custom)?;

    Ok(reply(StatusCode::CREATED, article))
}

pub async fn list_articles(
    page: Page,
    _user_id: UserId,
    article_service: Arc<dyn ArticleService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let articles = article_service
        .list(page)
        .await
        .map_err(ApiFailure::from)
        .map_err(reject::custom)?;

    Ok(reply(StatusCode::OK, articles))
}

pub async fn list_my_articles(
    page: Page,
    user_id: UserId,
    article_service: Arc<dyn ArticleService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let articles = article_service
        .list_by_author(user_id, page)
        .await
        .map_err(ApiFailure::from)
        .map_err(reject::custom)?;

    Ok(reply(StatusCode::OK, articles))
}

pub async fn get_article(
    id: ArticleId,
    user_id: UserId,
    article_service: Arc<dyn ArticleService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let article = article_service
        .get(user_id, id)
        .await
        .map_err(ApiFailure::from)
        .map_err(reject::custom)?;

    Ok(reply(StatusCode::OK, article))
}

pub async fn get_article_unchecked(
    id: ArticleId,
    _user_id: UserId,
    article_service: Arc<dyn ArticleService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let article = article_service
        .get_any(id)
        .await
        .map_err(ApiFailure::from)
        .map_err(reject::custom)?;

    Ok(reply(StatusCode::OK, article))
}

pub async fn update_article(
    id: ArticleId,
    user_id: UserId,
    form: FormData,
    max_file_size: u64,
    article_service: Arc<dyn ArticleService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut form = read_form(form, max_file_size).await?;
    let update = ArticleUpdate {
        title: form.text("title"),
        description: form.text("description"),
        category: form.text("category"),
        tags: form.text("tags"),
        remove_image: form.flag("removeImage"),
        image: form.take_image(),
    };

    let article = article_service
        .update(user_id, id, update)
        .await
        .map_err(ApiFailure::from)
        .map_err(reject::custom)?;

    Ok(reply(StatusCode::OK, article))
}

pub async fn delete_article(
    id: ArticleId,
    user_id: UserId,
    article_service: Arc<dyn ArticleService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    article_service
        .delete(user_id, id)
        .await
        .map_err(ApiFailure::from)
        .map_err(reject::custom)?;

    Ok(reply(
        StatusCode::OK,
        MessageResponse {
            message: "Article deleted successfully",
        },
    ))
}

pub async fn block_article(
    id: ArticleId,
    user_id: UserId,
    article_service: Arc<dyn ArticleService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let article = article_service
        .toggle_block(user_id, id)
        .await
        .map_err(ApiFailure::from)
        .map_err(reject::custom)?;

    Ok(reply(StatusCode::OK, article))
}

pub async fn react_to_article(
    id: ArticleId,
    reaction: Reaction,
    user_id: UserId,
    article_service: Arc<dyn ArticleService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let article = article_service
        .react(user_id, id, reaction)
        .await
        .map_err(ApiFailure::from)
        .map_err(reject::custom)?;

    Ok(reply(StatusCode::OK, article))
}

// endregion
