//! Application and request contexts
//!
//! [`Application`] is the application scope: settings, known validation
//! groups, messages, the constraint engine provider and application-scoped
//! attributes and beans. It lives for the lifetime of the application and is
//! shared by all requests.
//!
//! [`FacesContext`] is the per-request scope. It is owned by the thread
//! processing the request and needs no locking.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;

use crate::component::ViewRoot;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::expression::{ElContext, ImplicitObject};
use crate::locale::{Locale, MessageBundle};
use crate::validators::engine::{BeanMetadata, MetadataProvider, ValidationProvider};
use crate::validators::groups::GroupRegistry;
use crate::validators::messages::FacesMessage;
use crate::validators::whole_bean::CandidateRegistry;
use crate::validators::{BeanValidator, Validator};
use crate::value::{Bean, Value};
use crate::{VALIDATOR_FACTORY_KEY, VALIDATOR_ID};

/// Attribute storage of the application scope
pub type AttributeMap = IndexMap<String, Arc<dyn Any + Send + Sync>>;

/// The application scope
pub struct Application {
    settings: Settings,
    groups: GroupRegistry,
    bundle: Arc<MessageBundle>,
    provider: Arc<dyn ValidationProvider>,
    attributes: RwLock<AttributeMap>,
    beans: RwLock<IndexMap<String, Value>>,
}

impl Application {
    /// Start building an application
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::default()
    }

    /// Get the settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get the validation group registry
    pub fn groups(&self) -> &GroupRegistry {
        &self.groups
    }

    /// Get the message bundle
    pub fn bundle(&self) -> &MessageBundle {
        &self.bundle
    }

    /// Get the constraint engine provider
    pub fn provider(&self) -> &Arc<dyn ValidationProvider> {
        &self.provider
    }

    /// Get an application attribute
    pub fn attribute(&self, key: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.attributes
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(key)
            .cloned()
    }

    /// Set an application attribute
    pub fn set_attribute(&self, key: &str, value: Arc<dyn Any + Send + Sync>) {
        self.with_attributes_mut(|attributes| {
            attributes.insert(key.to_string(), value);
        });
    }

    /// Remove an application attribute
    pub fn remove_attribute(&self, key: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.with_attributes_mut(|attributes| attributes.shift_remove(key))
    }

    /// Run `f` with exclusive access to the attributes
    pub fn with_attributes_mut<R>(&self, f: impl FnOnce(&mut AttributeMap) -> R) -> R {
        let mut attributes = self.attributes.write().unwrap_or_else(|p| p.into_inner());
        f(&mut attributes)
    }

    /// Bind an application-scoped bean
    pub fn put_bean(&self, name: &str, value: impl Into<Value>) {
        self.beans
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(name.to_string(), value.into());
    }

    /// Get an application-scoped bean
    pub fn bean(&self, name: &str) -> Option<Value> {
        self.beans
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(name)
            .cloned()
    }

    /// Identifiers of the validators attached to every input component
    pub fn default_validator_ids(&self) -> Vec<&'static str> {
        if self.settings.disable_default_validator {
            Vec::new()
        } else {
            vec![VALIDATOR_ID]
        }
    }

    /// Create a validator by identifier
    pub fn create_validator(&self, id: &str) -> Result<Arc<dyn Validator>> {
        match id {
            VALIDATOR_ID => Ok(Arc::new(BeanValidator::new())),
            _ => Err(Error::Configuration(format!("Unknown validator id: {}", id))),
        }
    }

    /// Release application-scoped resources
    ///
    /// Drops the cached validator factory; the next validation builds a new one.
    pub fn shutdown(&self) {
        self.remove_attribute(VALIDATOR_FACTORY_KEY);
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attributes = self.attributes.read().unwrap_or_else(|p| p.into_inner());
        f.debug_struct("Application")
            .field("settings", &self.settings)
            .field("groups", &self.groups.names())
            .field("provider", &self.provider)
            .field("attributes", &attributes.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`Application`]
#[derive(Debug, Default)]
pub struct ApplicationBuilder {
    settings: Settings,
    groups: Vec<String>,
    bundle: Option<MessageBundle>,
    metadata: BeanMetadata,
    provider: Option<Arc<dyn ValidationProvider>>,
}

impl ApplicationBuilder {
    /// Set the settings
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Register a validation group name
    pub fn group(mut self, name: impl Into<String>) -> Self {
        self.groups.push(name.into());
        self
    }

    /// Replace the built-in message bundle
    pub fn bundle(mut self, bundle: MessageBundle) -> Self {
        self.bundle = Some(bundle);
        self
    }

    /// Set the constraint metadata for the built-in engine
    pub fn metadata(mut self, metadata: BeanMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Use a custom constraint engine provider instead of the built-in one
    pub fn provider(mut self, provider: Arc<dyn ValidationProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Build the application
    pub fn build(self) -> Arc<Application> {
        let bundle = Arc::new(self.bundle.unwrap_or_else(MessageBundle::builtin));
        let provider: Arc<dyn ValidationProvider> = match self.provider {
            Some(provider) => provider,
            None => Arc::new(MetadataProvider::new(self.metadata, Arc::clone(&bundle))),
        };
        Arc::new(Application {
            settings: self.settings,
            groups: GroupRegistry::with_groups(self.groups.iter().map(String::as_str)),
            bundle,
            provider,
            attributes: RwLock::new(IndexMap::new()),
            beans: RwLock::new(IndexMap::new()),
        })
    }
}

/// The per-request context
#[derive(Debug)]
pub struct FacesContext {
    application: Arc<Application>,
    view_root: Option<ViewRoot>,
    attributes: IndexMap<String, Value>,
    candidates: Option<CandidateRegistry>,
    messages: Vec<(Option<String>, FacesMessage)>,
    validation_failed: bool,
}

impl FacesContext {
    /// Create a context for a request to `application`
    pub fn new(application: Arc<Application>) -> Self {
        Self {
            application,
            view_root: None,
            attributes: IndexMap::new(),
            candidates: None,
            messages: Vec::new(),
            validation_failed: false,
        }
    }

    /// Set the view root
    pub fn with_view_root(mut self, view_root: ViewRoot) -> Self {
        self.view_root = Some(view_root);
        self
    }

    /// Get the application
    pub fn application(&self) -> &Application {
        &self.application
    }

    /// Get the view root
    pub fn view_root(&self) -> Option<&ViewRoot> {
        self.view_root.as_ref()
    }

    /// Locale of the view root, if any
    pub fn view_locale(&self) -> Option<Locale> {
        self.view_root.as_ref().and_then(|v| v.locale()).cloned()
    }

    /// Locale for user-facing messages: the view's, else the platform default
    pub fn message_locale(&self) -> Locale {
        self.view_locale().unwrap_or_else(Locale::platform_default)
    }

    /// Get a request attribute
    pub fn request_attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Set a request attribute
    pub fn set_request_attribute(&mut self, name: &str, value: impl Into<Value>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    /// Queue a message, for a component or globally
    pub fn add_message(&mut self, client_id: Option<&str>, message: FacesMessage) {
        self.messages.push((client_id.map(str::to_string), message));
    }

    /// All queued messages in order
    pub fn messages(&self) -> &[(Option<String>, FacesMessage)] {
        &self.messages
    }

    /// Messages queued for one component (`None` for global messages)
    pub fn messages_for(&self, client_id: Option<&str>) -> Vec<&FacesMessage> {
        self.messages
            .iter()
            .filter(|(id, _)| id.as_deref() == client_id)
            .map(|(_, message)| message)
            .collect()
    }

    /// Record that validation failed in this request
    pub fn mark_validation_failed(&mut self) {
        self.validation_failed = true;
    }

    /// Check if validation failed in this request
    pub fn is_validation_failed(&self) -> bool {
        self.validation_failed
    }

    /// Whole-bean candidates collected so far
    pub fn candidates(&self) -> Option<&CandidateRegistry> {
        self.candidates.as_ref()
    }

    /// Whole-bean candidates, created on first use
    pub fn candidates_mut(&mut self) -> &mut CandidateRegistry {
        self.candidates.get_or_insert_with(CandidateRegistry::new)
    }

    fn view_bean(&self) -> Value {
        match self.view_root {
            Some(ref view) => Value::Bean(Bean::from_pairs(
                "javax.faces.component.UIViewRoot",
                [
                    ("viewId", Value::from(view.view_id())),
                    (
                        "locale",
                        view.locale().map(|l| Value::from(l.to_string())).unwrap_or_default(),
                    ),
                ],
            )),
            None => Value::Null,
        }
    }
}

impl ElContext for FacesContext {
    fn resolve_variable(&self, name: &str) -> Option<Value> {
        if let Some(implicit) = ImplicitObject::from_name(name) {
            return Some(match implicit {
                ImplicitObject::View => self.view_bean(),
                ImplicitObject::RequestScope => Value::Map(self.attributes.clone()),
                ImplicitObject::ApplicationScope => Value::Map(
                    self.application
                        .beans
                        .read()
                        .unwrap_or_else(|p| p.into_inner())
                        .clone(),
                ),
            });
        }
        self.attributes
            .get(name)
            .cloned()
            .or_else(|| self.application.bean(name))
    }
}
