//! Core library for the opencast-bridge command line application.
//!
//! The library keeps course-scoped groups, series, events and access control
//! lists on an Opencast platform in line with local course configuration.
//! Transports live under [`opencast::bridge::io`], entity representations
//! inside [`opencast::bridge::model`], the ACL merge logic in
//! [`opencast::bridge::acl`], and the reconciliation engine under
//! [`opencast::bridge::sync`].

pub mod opencast;

pub use opencast::bridge::{
    BridgeError, Result, acl, config, directory, error, io, model, sync, template,
};
