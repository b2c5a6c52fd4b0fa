//! Blocking HTTP/1.1 client speaking directly over TCP and TLS sockets.
//!
//! barehttp does its own framing: it writes the request head, streams the
//! request body and reads the response head straight off the socket. Only
//! `Content-Length` delimited bodies are supported, and every request uses
//! its own connection with `Connection: close`.
//!
//! Requests and responses are the types of the [`http`] crate, with a
//! [`Body`] that is a [`stream::Stream`]. Streams compose, which means a
//! `multipart/form-data` body with file uploads is sent without buffering the
//! files in memory.
//!
//! # Example
//!
//! ```no_run
//! use barehttp::{Body, Client, Config};
//! use barehttp::http::Request;
//! use barehttp::stream::{Form, Stream};
//!
//! let client = Client::new(Config::default())?;
//!
//! let form = Form::new()
//!     .text("title", "holiday")
//!     .file("photo", "/tmp/beach.jpg")?;
//!
//! let request = Request::post("https://upload.example.test/photos")
//!     .header("x-api-key", "secret")
//!     .body(Body::form(form)?)
//!     .unwrap();
//!
//! let mut response = client.send_request(request)?;
//! println!("{}", response.status());
//!
//! let bytes = response.body_mut().contents()?;
//! # Ok::<_, barehttp::Error>(())
//! ```
//!
//! # Redirects
//!
//! 3xx responses with a `Location` are followed up to
//! [`Config::max_redirects`] times per call. The request body is rewound
//! and sent again, which fails for bodies that cannot be rewound.
//!
//! # Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade.
//! Connections, redirects and statuses are logged at `debug`, heads and body
//! chunks at `trace`.

#[macro_use]
extern crate log;

// Re-export the basis for this library.
pub use http;

mod error;
pub use error::{Error, ErrorKind};
pub(crate) use error::Result;

mod ext;

pub mod url;

pub mod codec;
pub use codec::{ReasonPhrase, RequestTarget};

mod body;
pub use body::Body;

pub mod stream;

mod config;
pub use config::{Config, TlsOptions, TlsVersion};

mod transport;
pub use transport::Connection;

mod client;
pub use client::{Client, RedirectBudget};
