use super::error::*;
use super::handler;
use crate::application_port::{AuthError, AuthService};
use crate::domain_model::*;
use crate::server::*;
use bytes::Bytes;
use std::convert::Infallible;
use std::sync::Arc;
use warp::multipart::FormData;
use warp::{Filter, reject};

/// Slack on top of the image limit for the text fields and multipart framing.
const FORM_OVERHEAD: u64 = 64 * 1024;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    auth_routes(server.clone())
        .or(user_routes(server.clone()))
        .or(article_routes(server))
}

fn auth_routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let register = warp::path!("user" / "register")
        .and(warp::post())
        .and(multipart(server.max_file_size))
        .and(with(server.auth_service.clone()))
        .and_then(handler::register);

    let login = warp::path!("user" / "login")
        .and(warp::post())
        .and(warp::body::content_length_limit(FORM_OVERHEAD))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let refresh = warp::path!("user" / "refresh")
        .and(warp::post())
        .and(optional_body(FORM_OVERHEAD))
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh);

    let logout = warp::path!("user" / "logout")
        .and(warp::post())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    register.or(login).or(refresh).or(logout)
}

fn user_routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let profile = warp::path!("user" / "profile")
        .and(warp::get())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.user_service.clone()))
        .and_then(handler::get_profile);

    let update_profile = warp::path!("user" / "update_profile")
        .and(warp::put())
        .and(with_verification(server.auth_service.clone()))
        .and(multipart(server.max_file_size))
        .and(with(server.user_service.clone()))
        .and_then(handler::update_profile);

    let user_by_id = warp::path!("user" / UserId)
        .and(warp::get())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.user_service.clone()))
        .and_then(handler::get_user_profile);

    let user_articles = warp::path!("user" / UserId / "articles")
        .and(warp::get())
        .and(warp::query::<Page>())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.article_service.clone()))
        .and_then(handler::get_user_articles);

    profile.or(update_profile).or(user_by_id).or(user_articles)
}

fn article_routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let auth = || with_verification(server.auth_service.clone());
    let articles = || with(server.article_service.clone());

    let create = warp::path!("user" / "articles")
        .and(warp::post())
        .and(auth())
        .and(multipart(server.max_file_size))
        .and(articles())
        .and_then(handler::create_article);

    let list = warp::path!("user" / "articles")
        .and(warp::get())
        .and(warp::query::<Page>())
        .and(auth())
        .and(articles())
        .and_then(handler::list_articles);

    let list_mine = warp::path!("user" / "articles" / "user")
        .and(warp::get())
        .and(warp::query::<Page>())
        .and(auth())
        .and(articles())
        .and_then(handler::list_my_articles);

    let get = warp::path!("user" / "articles" / ArticleId)
        .and(warp::get())
        .and(auth())
        .and(articles())
        .and_then(handler::get_article);

    let get_unchecked = warp::path!("user" / "articles" / "user" / ArticleId)
        .and(warp::get())
        .and(auth())
        .and(articles())
        .and_then(handler::get_article_unchecked);

    let update = warp::path!("user" / "articles" / ArticleId)
        .and(warp::put())
        .and(auth())
        .and(multipart(server.max_file_size))
        .and(articles())
        .and_then(handler::update_article);

    let delete = warp::path!("user" / "articles" / ArticleId)
        .and(warp::delete())
        .and(auth())
        .and(articles())
        .and_then(handler::delete_article);

    let block = warp::path!("user" / "articles" / ArticleId / "block")
        .and(warp::post())
        .and(auth())
        .and(articles())
        .and_then(handler::block_article);

    let like = warp::path!("user" / "articles" / ArticleId / "like")
        .and(warp::post())
        .map(|id: ArticleId| (id, Reaction::Like))
        .untuple_one()
        .and(auth())
        .and(articles())
        .and_then(handler::react_to_article);

    let dislike = warp::path!("user" / "articles" / ArticleId / "dislike")
        .and(warp::post())
        .map(|id: ArticleId| (id, Reaction::Dislike))
        .untuple_one()
        .and(auth())
        .and(articles())
        .and_then(handler::react_to_article);

    create
        .or(list)
        .or(list_mine)
        .or(get_unchecked)
        .or(get)
        .or(update)
        .or(delete)
        .or(block)
        .or(like)
        .or(dislike)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// Buffered multipart body plus the per-file limit the handler enforces.
fn multipart(
    max_file_size: u64,
) -> impl Filter<Extract = (FormData, u64), Error = warp::Rejection> + Clone {
    let limit = max_file_size + FORM_OVERHEAD;
    warp::body::content_length_limit(limit)
        .and(warp::multipart::form().max_length(limit))
        .and(warp::any().map(move || max_file_size))
}

/// Raw body bytes, or an empty body when the request carries no
/// `Content-Length`. A declared length above `limit` is still refused.
fn optional_body(
    limit: u64,
) -> impl Filter<Extract = (Bytes,), Error = warp::Rejection> + Clone {
    let bounded = warp::body::content_length_limit(limit).and(warp::body::bytes());
    let absent = warp::header::optional::<String>("content-length").and_then(
        |length: Option<String>| async move {
            match length {
                None => Ok(Bytes::new()),
                Some(_) => Err(reject::not_found()),
            }
        },
    );
    bounded.or(absent).unify()
}

fn with_verification(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (UserId,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(
        move |header: Option<String>| {
            let auth_service = auth_service.clone();
            async move {
                let token = header
                    .as_deref()
                    .and_then(|h| h.strip_prefix("Bearer "))
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .ok_or(AuthError::MissingToken)
                    .map_err(ApiFailure::from)
                    .map_err(reject::custom)?;
                let user_id = auth_service
                    .verify_token(token)
                    .await
                    .map_err(ApiFailure::from)
                    .map_err(reject::custom)?;
                Ok::<_, warp::Rejection>(user_id)
            }
        },
    )
}
