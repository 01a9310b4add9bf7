//! User handler: registration, bearer-token authentication and profiles.

use super::{matches_any_skill, skill_filter, HandlerError};
use crate::engine::event_bus::EventBus;
use crate::lifecycle::{validate_request, LifecycleError};
use crate::state::{Document, StateMachine};
use market_config::MarketplaceConfig;
use market_storage::StorageService;
use market_types::{
	current_timestamp, new_id, paginate, truncate_id, Actor, FreelancerQuery, MarketEvent, Order,
	OrderStatus, PageQuery, Pagination, PublicUser, RegisterRequest, StorageKey,
	UpdateProfileRequest, User, UserEvent, UserRole,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::instrument;

impl Document for User {
	const NAMESPACE: StorageKey = StorageKey::Users;
	const KIND: &'static str = "User";

	fn id(&self) -> &str {
		&self.id
	}

	fn touch(&mut self, now: u64) {
		self.updated_at = now;
	}
}

pub type UserStore = StateMachine<User>;

/// Track record of a freelancer, derived from their completed orders.
#[derive(Debug, Default, Clone, Copy)]
struct FreelancerStats {
	rating_sum: u32,
	rating_count: u32,
	completed: usize,
}

impl FreelancerStats {
	/// Mean client rating rounded to two decimals, 0 when unrated.
	fn rating(&self) -> f64 {
		if self.rating_count == 0 {
			return 0.0;
		}
		let mean = f64::from(self.rating_sum) / f64::from(self.rating_count);
		(mean * 100.0).round() / 100.0
	}

	fn apply(&self, user: &mut PublicUser) {
		user.rating = self.rating();
		user.total_projects = self.completed;
	}
}

/// Handler for user accounts.
pub struct UserHandler {
	users: Arc<UserStore>,
	storage: Arc<StorageService>,
	event_bus: EventBus,
	limits: MarketplaceConfig,
	/// Serializes registrations so the email check and the insert agree.
	registration_lock: Mutex<()>,
}

impl UserHandler {
	pub fn new(
		users: Arc<UserStore>,
		storage: Arc<StorageService>,
		event_bus: EventBus,
		limits: MarketplaceConfig,
	) -> Self {
		Self {
			users,
			storage,
			event_bus,
			limits,
			registration_lock: Mutex::new(()),
		}
	}

	/// Registers a new user and issues their API key.
	#[instrument(skip_all, fields(role = %request.role))]
	pub async fn register(&self, request: RegisterRequest) -> Result<User, HandlerError> {
		validate_request(&request)?;
		let email = request.email.trim().to_lowercase();

		let _guard = self.registration_lock.lock().await;
		if self
			.storage
			.exists(StorageKey::UserByEmail.as_str(), &email)
			.await?
		{
			return Err(LifecycleError::Conflict("User already exists with this email".into()).into());
		}

		let now = current_timestamp();
		let user = User {
			id: new_id(),
			email: email.clone(),
			first_name: request.first_name.trim().to_string(),
			last_name: request.last_name.trim().to_string(),
			role: request.role,
			phone: None,
			location: None,
			bio: None,
			skills: Vec::new(),
			experience: None,
			portfolio: Vec::new(),
			is_active: true,
			api_key: new_id(),
			created_at: now,
			updated_at: now,
		};

		self.users.store(&user).await?;
		self.storage
			.store(StorageKey::UserByEmail.as_str(), &email, &user.id)
			.await?;
		self.storage
			.store(StorageKey::UserByToken.as_str(), &user.api_key, &user.id)
			.await?;

		tracing::info!(user_id = %truncate_id(&user.id), "User registered");
		self.event_bus
			.publish(MarketEvent::User(UserEvent::Registered {
				user_id: user.id.clone(),
				role: user.role,
			}))
			.ok();

		Ok(user)
	}

	/// Resolves a bearer token to an active user.
	pub async fn authenticate(&self, token: &str) -> Result<User, HandlerError> {
		let token = token.trim();
		if token.is_empty() {
			return Err(HandlerError::Unauthenticated);
		}

		let user_id: String = self
			.storage
			.find(StorageKey::UserByToken.as_str(), token)
			.await?
			.ok_or(HandlerError::Unauthenticated)?;
		let user: User = self
			.storage
			.find(User::NAMESPACE.as_str(), &user_id)
			.await?
			.ok_or(HandlerError::Unauthenticated)?;

		if !user.is_active {
			tracing::debug!(user_id = %truncate_id(&user.id), "Rejected inactive user");
			return Err(HandlerError::Unauthenticated);
		}
		Ok(user)
	}

	/// Gets a user by ID.
	pub async fn get(&self, user_id: &str) -> Result<User, HandlerError> {
		Ok(self.users.get(user_id).await?)
	}

	pub async fn profile(&self, actor: &Actor) -> Result<User, HandlerError> {
		self.get(&actor.id).await
	}

	/// Applies the non-empty fields of `request` to the actor's profile.
	#[instrument(skip_all, fields(user_id = %truncate_id(&actor.id)))]
	pub async fn update_profile(
		&self,
		actor: &Actor,
		request: UpdateProfileRequest,
	) -> Result<User, HandlerError> {
		validate_request(&request)?;

		fn set(target: &mut String, value: Option<String>) {
			if let Some(value) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
				*target = value;
			}
		}
		fn set_opt(target: &mut Option<String>, value: Option<String>) {
			if let Some(value) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
				*target = Some(value);
			}
		}

		let (user, ()) = self
			.users
			.update_with(&actor.id, |user| {
				set(&mut user.first_name, request.first_name);
				set(&mut user.last_name, request.last_name);
				set_opt(&mut user.phone, request.phone);
				set_opt(&mut user.location, request.location);
				set_opt(&mut user.bio, request.bio);
				set_opt(&mut user.experience, request.experience);
				if let Some(skills) = request.skills.filter(|s| !s.is_empty()) {
					user.skills = skills;
				}
				if let Some(portfolio) = request.portfolio.filter(|p| !p.is_empty()) {
					user.portfolio = portfolio;
				}
				Ok(())
			})
			.await?;

		tracing::info!("Profile updated");
		self.event_bus
			.publish(MarketEvent::User(UserEvent::ProfileUpdated {
				user_id: user.id.clone(),
			}))
			.ok();

		Ok(user)
	}

	async fn active_users(&self, role: UserRole) -> Result<Vec<User>, HandlerError> {
		let mut users = self.users.all().await?;
		users.retain(|u| u.role == role && u.is_active);
		users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
		Ok(users)
	}

	/// Completed orders and client ratings per freelancer id.
	async fn freelancer_stats(&self) -> Result<HashMap<String, FreelancerStats>, HandlerError> {
		let orders: Vec<Order> = self
			.storage
			.retrieve_all(StorageKey::Orders.as_str())
			.await?;

		let mut stats: HashMap<String, FreelancerStats> = HashMap::new();
		for order in orders.iter().filter(|o| o.status == OrderStatus::Completed) {
			let entry = stats.entry(order.freelancer.clone()).or_default();
			entry.completed += 1;
			if let Some(review) = &order.reviews.client_review {
				entry.rating_sum += u32::from(review.rating);
				entry.rating_count += 1;
			}
		}
		Ok(stats)
	}

	/// Lists active freelancers, best rated first, optionally filtered by
	/// skills and location.
	pub async fn list_freelancers(
		&self,
		query: FreelancerQuery,
	) -> Result<(Vec<PublicUser>, Pagination), HandlerError> {
		let skills = skill_filter(query.skills.as_deref());
		let location = query
			.location
			.map(|l| l.trim().to_lowercase())
			.filter(|l| !l.is_empty());

		let stats = self.freelancer_stats().await?;
		let mut freelancers: Vec<PublicUser> = self
			.active_users(UserRole::Freelancer)
			.await?
			.iter()
			.filter(|u| matches_any_skill(&u.skills, &skills))
			.filter(|u| match &location {
				Some(wanted) => u
					.location
					.as_deref()
					.is_some_and(|l| l.to_lowercase().contains(wanted)),
				None => true,
			})
			.map(|u| {
				let mut public = PublicUser::from(u);
				if let Some(stats) = stats.get(&u.id) {
					stats.apply(&mut public);
				}
				public
			})
			.collect();
		freelancers.sort_by(|a, b| {
			b.rating
				.total_cmp(&a.rating)
				.then_with(|| b.total_projects.cmp(&a.total_projects))
				.then_with(|| b.created_at.cmp(&a.created_at))
				.then_with(|| a.id.cmp(&b.id))
		});

		Ok(paginate(
			freelancers,
			query.page,
			query.limit,
			self.limits.default_page_size,
			self.limits.max_page_size,
		))
	}

	/// Gets an active freelancer's public profile.
	pub async fn get_freelancer(&self, user_id: &str) -> Result<PublicUser, HandlerError> {
		let user = match self
			.storage
			.find::<User>(User::NAMESPACE.as_str(), user_id)
			.await?
		{
			Some(user) if user.role == UserRole::Freelancer && user.is_active => user,
			_ => return Err(LifecycleError::NotFound("Freelancer not found".into()).into()),
		};

		let mut freelancer = PublicUser::from(&user);
		if let Some(stats) = self.freelancer_stats().await?.get(&user.id) {
			stats.apply(&mut freelancer);
		}
		Ok(freelancer)
	}

	/// Lists active clients. Only freelancers may browse clients.
	pub async fn list_clients(
		&self,
		actor: &Actor,
		query: PageQuery,
	) -> Result<(Vec<PublicUser>, Pagination), HandlerError> {
		if actor.role != UserRole::Freelancer {
			return Err(
				LifecycleError::Forbidden("Only freelancers can browse clients".into()).into(),
			);
		}

		let clients: Vec<PublicUser> = self
			.active_users(UserRole::Client)
			.await?
			.iter()
			.map(PublicUser::from)
			.collect();

		Ok(paginate(
			clients,
			query.page,
			query.limit,
			self.limits.default_page_size,
			self.limits.max_page_size,
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{accepted_project, order_request, register, TestMarket};
	use market_storage::implementations::file::FileStorage;
	use market_types::{OrderStatusRequest, ReviewRequest};

	#[tokio::test]
	async fn test_register_and_authenticate() {
		let market = TestMarket::new();
		let user = register(&market, "Ada@Example.com", UserRole::Client).await;
		assert_eq!(user.email, "ada@example.com");

		let resolved = market.users().authenticate(&user.api_key).await.unwrap();
		assert_eq!(resolved.id, user.id);

		assert!(matches!(
			market.users().authenticate("bogus").await,
			Err(HandlerError::Unauthenticated)
		));
		assert!(matches!(
			market.users().authenticate("  ").await,
			Err(HandlerError::Unauthenticated)
		));
	}

	#[tokio::test]
	async fn test_duplicate_email_conflicts() {
		let market = TestMarket::new();
		register(&market, "dup@example.com", UserRole::Client).await;

		let err = market
			.users()
			.register(RegisterRequest {
				email: "DUP@example.com".into(),
				first_name: "Other".into(),
				last_name: "Person".into(),
				role: UserRole::Freelancer,
			})
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			HandlerError::Lifecycle(LifecycleError::Conflict(_))
		));
	}

	#[tokio::test]
	async fn test_register_validates_fields() {
		let market = TestMarket::new();
		let err = market
			.users()
			.register(RegisterRequest {
				email: "not-an-email".into(),
				first_name: "".into(),
				last_name: "X".into(),
				role: UserRole::Client,
			})
			.await
			.unwrap_err();
		assert!(matches!(err, HandlerError::Lifecycle(LifecycleError::Invalid(_))));
	}

	#[tokio::test]
	async fn test_update_profile_keeps_empty_fields() {
		let market = TestMarket::new();
		let user = register(&market, "f@example.com", UserRole::Freelancer).await;

		let updated = market
			.users()
			.update_profile(
				&user.actor(),
				UpdateProfileRequest {
					first_name: Some("  ".into()),
					location: Some("Lisbon".into()),
					skills: Some(vec!["Rust".into(), "Go".into()]),
					..Default::default()
				},
			)
			.await
			.unwrap();

		assert_eq!(updated.first_name, user.first_name);
		assert_eq!(updated.location.as_deref(), Some("Lisbon"));
		assert_eq!(updated.skills, vec!["Rust", "Go"]);
	}

	#[tokio::test]
	async fn test_freelancer_listing_filters() {
		let market = TestMarket::new();
		let rustacean = register(&market, "r@example.com", UserRole::Freelancer).await;
		register(&market, "d@example.com", UserRole::Freelancer).await;
		register(&market, "c@example.com", UserRole::Client).await;

		market
			.users()
			.update_profile(
				&rustacean.actor(),
				UpdateProfileRequest {
					skills: Some(vec!["Rust".into()]),
					location: Some("Berlin, Germany".into()),
					..Default::default()
				},
			)
			.await
			.unwrap();

		let (all, page) = market
			.users()
			.list_freelancers(FreelancerQuery::default())
			.await
			.unwrap();
		assert_eq!(all.len(), 2);
		assert_eq!(page.total, 2);

		let (filtered, _) = market
			.users()
			.list_freelancers(FreelancerQuery {
				skills: Some("rust,python".into()),
				location: Some("berlin".into()),
				..Default::default()
			})
			.await
			.unwrap();
		assert_eq!(filtered.len(), 1);
		assert_eq!(filtered[0].id, rustacean.id);
	}

	#[tokio::test]
	async fn test_clients_visible_to_freelancers_only() {
		let market = TestMarket::new();
		let client = register(&market, "c@example.com", UserRole::Client).await;
		let freelancer = register(&market, "f@example.com", UserRole::Freelancer).await;

		let (clients, _) = market
			.users()
			.list_clients(&freelancer.actor(), PageQuery::default())
			.await
			.unwrap();
		assert_eq!(clients.len(), 1);

		assert!(matches!(
			market
				.users()
				.list_clients(&client.actor(), PageQuery::default())
				.await,
			Err(HandlerError::Lifecycle(LifecycleError::Forbidden(_)))
		));

		assert!(market.users().get_freelancer(&freelancer.id).await.is_ok());
		assert!(matches!(
			market.users().get_freelancer(&client.id).await,
			Err(HandlerError::Lifecycle(LifecycleError::NotFound(_)))
		));
	}

	#[tokio::test]
	async fn test_similar_emails_register_on_file_storage() {
		let dir = tempfile::tempdir().unwrap();
		let market = TestMarket::with_backend(Box::new(FileStorage::new(dir.path().to_path_buf())));

		let first = register(&market, "a_b@example.com", UserRole::Client).await;
		let second = register(&market, "a/b@example.com", UserRole::Client).await;
		assert_ne!(first.id, second.id);

		let resolved = market.users().authenticate(&second.api_key).await.unwrap();
		assert_eq!(resolved.email, "a/b@example.com");
	}

	#[tokio::test]
	async fn test_freelancers_ranked_by_track_record() {
		let market = TestMarket::new();
		let (client, freelancer, project) = accepted_project(&market).await;
		let newcomer = register(&market, "new@example.com", UserRole::Freelancer).await;

		let order = market
			.orders()
			.create(&client.actor(), order_request(&project.id, &freelancer.id))
			.await
			.unwrap();
		market
			.orders()
			.update_status(
				&order.id,
				&freelancer.actor(),
				OrderStatusRequest {
					status: Some(OrderStatus::Completed),
					progress: None,
				},
			)
			.await
			.unwrap();
		market
			.orders()
			.add_review(
				&order.id,
				&client.actor(),
				ReviewRequest {
					rating: 4,
					comment: None,
				},
			)
			.await
			.unwrap();

		let (freelancers, _) = market
			.users()
			.list_freelancers(FreelancerQuery::default())
			.await
			.unwrap();
		assert_eq!(freelancers.len(), 2);
		assert_eq!(freelancers[0].id, freelancer.id);
		assert_eq!(freelancers[0].rating, 4.0);
		assert_eq!(freelancers[0].total_projects, 1);
		assert_eq!(freelancers[1].id, newcomer.id);
		assert_eq!(freelancers[1].rating, 0.0);
		assert_eq!(freelancers[1].total_projects, 0);

		let profile = market.users().get_freelancer(&freelancer.id).await.unwrap();
		assert_eq!(profile.rating, 4.0);
		assert_eq!(profile.total_projects, 1);
	}

	#[tokio::test]
	async fn test_concurrent_profile_updates_keep_both_fields() {
		let market = TestMarket::new();
		let user = register(&market, "f@example.com", UserRole::Freelancer).await;

		let updates = [
			UpdateProfileRequest {
				location: Some("Porto".into()),
				..Default::default()
			},
			UpdateProfileRequest {
				bio: Some("Backend developer".into()),
				..Default::default()
			},
		]
		.into_iter()
		.map(|request| {
			let engine = (*market).clone();
			let actor = user.actor();
			tokio::spawn(async move { engine.users().update_profile(&actor, request).await })
		})
		.collect::<Vec<_>>();
		for update in updates {
			update.await.unwrap().unwrap();
		}

		let stored = market.users().get(&user.id).await.unwrap();
		assert_eq!(stored.location.as_deref(), Some("Porto"));
		assert_eq!(stored.bio.as_deref(), Some("Backend developer"));
	}
}
