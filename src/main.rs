use std::process;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;

use tiny_http::{
    Method,
    Request,
    Server,
};

use env_logger;

use hashdrop::auth::AuthSpec;
use hashdrop::meta::{
    parse_type,
    FileInfo,
};
use hashdrop::request::process_method;
use hashdrop::response::{
    exec_response,
    preflight_response,
};
use hashdrop::state::State;

use log::{debug, error, info};

mod arg;

use arg::{
    Settings,
    SettingsError,
};


fn exec_request(state: &State, mut req: Request) {
    if req.method() == &Method::Options {
        preflight_response(req);
        return;
    }

    let mut auth_spec: Option<AuthSpec> = None;
    let mut info = FileInfo::default();

    for h in req.headers() {
        let k = &h.field;
        let v = h.value.as_str();
        if k.equiv("Authorization") {
            match AuthSpec::from_str(v) {
                Ok(r) => {
                    debug!("have auth {:?}", r);
                    auth_spec = Some(r);
                },
                Err(e) => {
                    debug!("{}", e);
                },
            }
        } else if k.equiv("X-Filename") {
            info.filename = v.to_string();
        } else if k.equiv("Content-Type") {
            info.content_type = parse_type(v).map(|m| m.to_string());
        }
    }

    let method = req.method().clone();
    let url = req.url().to_string();
    let expected_size = req.body_length().unwrap_or(0);
    info!("processing request {} for {}", &method, &url);

    let res = process_method(state, &method, &url, req.as_reader(), expected_size, auth_spec, info);
    exec_response(req, res);
}

fn main() {
    env_logger::init();

    let settings = match Settings::from_env() {
        Ok(v) => v,
        Err(SettingsError::Clap(e)) => {
            e.exit();
        },
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        },
    };

    let state = match State::new(settings.config.clone()) {
        Ok(v) => Arc::new(v),
        Err(e) => {
            error!("cannot initialize storage: {}", e);
            process::exit(1);
        },
    };
    info!("storing files in {:?}", state.storage_dir());

    let bind_addr = format!("{}:{}", &settings.host, settings.port);
    let srv = match Server::http(bind_addr.as_str()) {
        Ok(v) => Arc::new(v),
        Err(e) => {
            error!("unable to listen for http on {}: {}", &bind_addr, e);
            process::exit(1);
        },
    };
    info!("starting hashdrop on {} with {} workers", &bind_addr, settings.threads);

    let mut workers = vec!();
    for i in 0..settings.threads {
        let srv = srv.clone();
        let state = state.clone();
        let worker = thread::Builder::new()
            .name(format!("worker-{}", i))
            .spawn(move || {
                loop {
                    let req = match srv.recv() {
                        Ok(v) => v,
                        Err(e) => {
                            error!("{}", e);
                            break;
                        },
                    };
                    exec_request(&state, req);
                }
            });
        match worker {
            Ok(v) => workers.push(v),
            Err(e) => {
                error!("cannot start worker {}: {}", i, e);
                process::exit(1);
            },
        }
    }

    for worker in workers {
        if worker.join().is_err() {
            error!("worker exited abnormally");
        }
    }
}
