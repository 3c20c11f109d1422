#![doc = include_str!("../README.md")]

mod ast;
mod builtins;
pub mod capability;
mod config;
mod datastore;
mod engine;
mod env;
mod error;
mod eval;
mod function;
mod lexer;
mod parallel;
mod parser;
mod resource;
pub mod tracer;
mod token;
mod value;

pub use crate::{
    capability::{Capability, CapabilitySet},
    config::EngineConfig,
    datastore::{Registry as DatastoreRegistry, Store as DatastoreStore, StoreConfig, SYS_NAMESPACE},
    engine::{CollectingHooks, DefaultHooks, Engine, Hooks},
    error::{ParseError, Position, RuntimeError, RuntimeErrorKind, ScriptError, StackFrame, ThrownValue, WaitTimeout},
    function::{ArgMap, FunctionValue, HostFn, HostFunction, Param, ScriptFunction},
    tracer::{ChannelTracer, DebugEvent, EvalTracer, NoopTracer, RecordingTracer, StderrTracer},
    value::Value,
};
