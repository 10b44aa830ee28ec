use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use tokio_asgi::asgi::AsgiHandler;
use tokio_asgi::config::Config;
use tokio_asgi::core::{Context, Request, StaticTemplate, Template, TemplateResponse};
use tokio_asgi::dispatch::{AsyncHandler, DispatchPipeline, Handler, RouteArgs, UrlPatterns, View};
use tokio_asgi::middleware::{MiddlewareChain, XFrameOptionsMiddleware};
use tokio_asgi::server::Server;

const INDEX_HTML: &str = "<!DOCTYPE html>\n<html>\n<head><title>tokio_asgi</title></head>\n<body>\n<h1>{{ context_test }}</h1>\n<form method=\"post\" action=\"/test/form/\">\n<input name=\"message\"><button>Send</button>\n</form>\n</body>\n</html>\n";

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::from_env()?;

    if let Err(e) = tokio_asgi::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!("Starting tokio_asgi {}", tokio_asgi::VERSION);
    config.log_summary();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut middleware = MiddlewareChain::new();
    if let Some(value) = config.middleware.x_frame_options {
        middleware = middleware.add(XFrameOptionsMiddleware::new(value));
    }

    let pipeline = DispatchPipeline::new(Arc::new(urlpatterns()?))
        .with_debug(config.dispatch.debug)
        .with_middleware(middleware);
    let handler = AsgiHandler::from_config(Arc::new(pipeline), &config.dispatch);

    let server = Server::bind(&config.server, handler).await?;

    // Handle shutdown gracefully
    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
            server.trigger_shutdown();
        }
    }

    if !server.wait_for_drain(config.server.drain_timeout).await {
        info!("Exiting with {} open connections", server.active_connections());
    }

    Ok(())
}

/// Demo application: one template view mounted on two routes.
fn urlpatterns() -> tokio_asgi::core::Result<UrlPatterns> {
    let template: Arc<dyn Template> = Arc::new(StaticTemplate::new("index.html", INDEX_HTML));

    let get = {
        let template = Arc::clone(&template);
        AsyncHandler::new("get", move |_req: Arc<Request>, _args: RouteArgs| {
            let template = Arc::clone(&template);
            async move { Ok(Some(render_index(template).await)) }
        })
        .with_scope("TestView")
    };

    let post = AsyncHandler::new("post", move |req: Arc<Request>, _args: RouteArgs| {
        let template = Arc::clone(&template);
        async move {
            if let Ok(form) = req.post() {
                debug!(form = ?form, "Form submitted");
            }
            Ok(Some(render_index(template).await))
        }
    })
    .with_scope("TestView");

    let view: Arc<dyn Handler> = Arc::new(View::new("TestView").get(get).post(post));

    UrlPatterns::new()
        .path_arc("test/", Arc::clone(&view))?
        .path_arc("test/form/", view)
}

async fn render_index(template: Arc<dyn Template>) -> tokio_asgi::core::Response {
    tokio::time::sleep(Duration::from_millis(500)).await;

    let mut context = Context::new();
    context.insert("context_test".into(), "Hello context test.".into());
    TemplateResponse::new(template, context)
}
