//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`HeliosError`] covers all failure modes including:
//! - Backend selection and device initialization failures
//! - Resource creation errors (buffers, textures, shaders, models, targets)
//! - Shader compilation and link failures
//! - Programming-error class failures that are unreachable in correct call
//!   sequences (use-after-free, drawing with no bound target, applying an
//!   effect whose bindings went stale)
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, HeliosError>`.
//!
//! Resource-level errors surface synchronously to the caller of the creation
//! or draw call that triggered them. Nothing is retried or swallowed: this
//! pipeline has no transient-failure classes on the hot path, so a frame that
//! hits any of these errors is expected to stop rather than present a
//! partially-initialized image.

use thiserror::Error;

/// The main error type for the Helios engine.
#[derive(Error, Debug)]
pub enum HeliosError {
    // ========================================================================
    // Backend & Device Errors
    // ========================================================================
    /// Neither the requested backend nor the fallback backend is usable.
    #[error("backend unavailable: requested '{requested}': {detail}")]
    BackendUnavailable {
        /// The backend that was asked for.
        requested: &'static str,
        /// Probe or device-creation diagnostic.
        detail: String,
    },

    // ========================================================================
    // Resource Creation Errors
    // ========================================================================
    /// A creation factory call received invalid input or the backend
    /// rejected the resource.
    #[error("resource creation failed ({what}): {detail}")]
    ResourceCreation {
        /// Which resource kind was being created.
        what: &'static str,
        /// The offending value or backend diagnostic.
        detail: String,
    },

    /// An attachment set failed backend completeness validation.
    #[error("framebuffer incomplete ('{label}'): status {status:#x}")]
    FramebufferIncomplete {
        /// Label of the render target being constructed.
        label: String,
        /// Backend-reported completeness status code.
        status: u32,
    },

    // ========================================================================
    // Shader Errors
    // ========================================================================
    /// A shader stage failed to compile. Carries the backend diagnostic log.
    #[error("shader compile error ({stage}): {log}")]
    ShaderCompile {
        /// Stage that failed ("vertex", "fragment", "compute").
        stage: &'static str,
        /// Backend compile log.
        log: String,
    },

    /// A shader program failed to link. Carries the backend diagnostic log.
    #[error("shader link error: {log}")]
    ShaderLink {
        /// Backend link log.
        log: String,
    },

    // ========================================================================
    // Programming-Error Class
    //
    // These should be unreachable in correct call sequences and are treated
    // as fatal assertions, not recoverable conditions.
    // ========================================================================
    /// A draw or write referenced a resource handle whose resource has been
    /// destroyed. Detected via generation-stamped handles.
    #[error("use after free: stale {resource} handle")]
    UseAfterFree {
        /// Resource kind the stale handle pointed at.
        resource: &'static str,
    },

    /// A draw or clear was issued before any render target was bound.
    #[error("no render target bound")]
    NoTargetBound,

    /// An effect was applied after its input/output topology changed without
    /// an intervening `rebind()`.
    #[error("stale bind set: effect '{effect}' must be rebound before apply")]
    StaleBindSet {
        /// Name of the offending effect.
        effect: &'static str,
    },

    /// A render-target binding named a color attachment label the target
    /// does not declare.
    #[error("unknown attachment '{label}'")]
    UnknownAttachment {
        /// The label that failed to resolve.
        label: String,
    },
}

/// Alias for `Result<T, HeliosError>`.
pub type Result<T> = std::result::Result<T, HeliosError>;
