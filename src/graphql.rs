// GraphQL surface
//
// Wire views are separate from the domain entities: members never expose
// their password hash, and a promo resolves once at this boundary into the
// DepositPromo | SignUpPromo union keyed by its template. Domain errors
// surface as GraphQL errors carrying `extensions.code`.

use async_graphql::{
    Context, EmptySubscription, Error as GqlError, ErrorExtensions, InputObject, Object,
    OutputType, Schema, SimpleObject, Union,
};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::extract::State;
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};

use crate::auth::{hash_password, AuthContext};
use crate::eligibility::EligibilityEngine;
use crate::entities::{
    EnrollmentRequest, EnrollmentStatus, Member, MemberUpdate, Promo, PromoStatus,
    PromoTemplate, RequiredMemberField, Vendor, VendorType,
};
use crate::error::DomainError;
use crate::pagination::{paginate, Connection};
use crate::rest::AppState;
use crate::store::Storage;
use crate::workflow::EnrollmentWorkflow;

pub type PlatformSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

fn gql_err(err: DomainError) -> GqlError {
    let code = err.code();
    GqlError::new(err.to_string()).extend_with(|_, e| e.set("code", code))
}

// ============================================================================
// WIRE VIEWS
// ============================================================================

#[derive(SimpleObject)]
pub struct MemberView {
    pub id: String,
    pub username: String,
    pub real_name: Option<String>,
    pub email: Option<String>,
    pub bank_account: Option<String>,
    pub balance: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Member> for MemberView {
    fn from(member: Member) -> Self {
        MemberView {
            id: member.id,
            username: member.username,
            real_name: member.real_name,
            email: member.email,
            bank_account: member.bank_account,
            balance: member.balance,
            created_at: member.created_at,
            updated_at: member.updated_at,
        }
    }
}

#[derive(SimpleObject)]
pub struct VendorView {
    pub id: String,
    pub name: String,
    #[graphql(name = "type")]
    pub vendor_type: VendorType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Vendor> for VendorView {
    fn from(vendor: Vendor) -> Self {
        VendorView {
            id: vendor.id,
            name: vendor.name,
            vendor_type: vendor.vendor_type,
            created_at: vendor.created_at,
            updated_at: vendor.updated_at,
        }
    }
}

#[derive(SimpleObject)]
pub struct DepositPromo {
    pub id: String,
    pub name: String,
    pub status: PromoStatus,
    pub minimum_balance: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(SimpleObject)]
pub struct SignUpPromo {
    pub id: String,
    pub name: String,
    pub status: PromoStatus,
    pub required_member_fields: Vec<RequiredMemberField>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A promo resolves into exactly one variant, decided by its template.
#[derive(Union)]
pub enum PromoNode {
    Deposit(DepositPromo),
    SignUp(SignUpPromo),
}

impl From<Promo> for PromoNode {
    fn from(promo: Promo) -> Self {
        match promo.template {
            PromoTemplate::Deposit => PromoNode::Deposit(DepositPromo {
                id: promo.id,
                name: promo.name,
                status: promo.status,
                minimum_balance: promo.minimum_balance,
                created_at: promo.created_at,
                updated_at: promo.updated_at,
            }),
            PromoTemplate::SignUp => PromoNode::SignUp(SignUpPromo {
                id: promo.id,
                name: promo.name,
                status: promo.status,
                required_member_fields: promo.required_member_fields,
                created_at: promo.created_at,
                updated_at: promo.updated_at,
            }),
        }
    }
}

#[derive(SimpleObject)]
pub struct EnrollmentRequestView {
    pub id: String,
    pub member_id: String,
    pub promo_id: String,
    pub status: EnrollmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EnrollmentRequest> for EnrollmentRequestView {
    fn from(request: EnrollmentRequest) -> Self {
        EnrollmentRequestView {
            id: request.id,
            member_id: request.member_id,
            promo_id: request.promo_id,
            status: request.status,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

// ============================================================================
// CONNECTION VIEWS
// ============================================================================

#[derive(SimpleObject)]
#[graphql(concrete(name = "MemberEdge", params(MemberView)))]
#[graphql(concrete(name = "VendorEdge", params(VendorView)))]
#[graphql(concrete(name = "PromoEdge", params(PromoNode)))]
#[graphql(concrete(name = "EnrollmentRequestEdge", params(EnrollmentRequestView)))]
pub struct EdgeView<T: OutputType> {
    pub node: T,
    pub cursor: String,
}

#[derive(SimpleObject)]
pub struct PageInfoView {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

#[derive(SimpleObject)]
#[graphql(concrete(name = "MemberConnection", params(MemberView)))]
#[graphql(concrete(name = "VendorConnection", params(VendorView)))]
#[graphql(concrete(name = "PromoConnection", params(PromoNode)))]
#[graphql(concrete(name = "EnrollmentRequestConnection", params(EnrollmentRequestView)))]
pub struct ConnectionView<T: OutputType>
where
    EdgeView<T>: OutputType,
{
    pub total_count: i64,
    pub edges: Vec<EdgeView<T>>,
    pub page_info: PageInfoView,
}

fn to_view<N, V>(conn: Connection<N>) -> ConnectionView<V>
where
    V: OutputType + From<N>,
    EdgeView<V>: OutputType,
{
    ConnectionView {
        total_count: conn.total_count,
        edges: conn
            .edges
            .into_iter()
            .map(|edge| EdgeView {
                node: V::from(edge.node),
                cursor: edge.cursor,
            })
            .collect(),
        page_info: PageInfoView {
            end_cursor: conn.page_info.end_cursor,
            has_next_page: conn.page_info.has_next_page,
        },
    }
}

// ============================================================================
// INPUTS
// ============================================================================

#[derive(InputObject)]
pub struct CreateMemberInput {
    pub username: String,
    pub password: String,
    pub real_name: Option<String>,
    pub email: Option<String>,
    pub bank_account: Option<String>,
    pub balance: Option<f64>,
}

#[derive(InputObject)]
pub struct UpdateMemberInput {
    pub real_name: Option<String>,
    pub email: Option<String>,
    pub bank_account: Option<String>,
    pub balance: Option<f64>,
}

#[derive(InputObject)]
pub struct CreateVendorInput {
    pub name: String,
    #[graphql(name = "type")]
    pub vendor_type: VendorType,
}

#[derive(InputObject)]
pub struct UpdateVendorInput {
    pub name: Option<String>,
    #[graphql(name = "type")]
    pub vendor_type: Option<VendorType>,
}

#[derive(InputObject)]
pub struct CreatePromoInput {
    pub name: String,
    pub template: PromoTemplate,
    pub status: Option<PromoStatus>,
    pub minimum_balance: Option<f64>,
    pub required_member_fields: Option<Vec<RequiredMemberField>>,
}

#[derive(InputObject)]
pub struct UpdatePromoInput {
    pub name: Option<String>,
    pub status: Option<PromoStatus>,
    pub minimum_balance: Option<f64>,
    pub required_member_fields: Option<Vec<RequiredMemberField>>,
}

// ============================================================================
// QUERY ROOT
// ============================================================================

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn members(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        after: Option<String>,
    ) -> async_graphql::Result<ConnectionView<MemberView>> {
        let storage = ctx.data_unchecked::<Storage>();
        let members = storage.members.list().map_err(gql_err)?;
        let conn = paginate(members, first.map(i64::from), after.as_deref()).map_err(gql_err)?;
        Ok(to_view(conn))
    }

    async fn member(
        &self,
        ctx: &Context<'_>,
        id: String,
    ) -> async_graphql::Result<MemberView> {
        let storage = ctx.data_unchecked::<Storage>();
        let member = storage
            .members
            .find_by_id(&id)
            .map_err(gql_err)?
            .ok_or_else(|| gql_err(DomainError::MemberNotFound { id }))?;
        Ok(member.into())
    }

    async fn vendors(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        after: Option<String>,
    ) -> async_graphql::Result<ConnectionView<VendorView>> {
        let storage = ctx.data_unchecked::<Storage>();
        let vendors = storage.vendors.list().map_err(gql_err)?;
        let conn = paginate(vendors, first.map(i64::from), after.as_deref()).map_err(gql_err)?;
        Ok(to_view(conn))
    }

    async fn vendor(
        &self,
        ctx: &Context<'_>,
        id: String,
    ) -> async_graphql::Result<VendorView> {
        let storage = ctx.data_unchecked::<Storage>();
        let vendor = storage
            .vendors
            .find_by_id(&id)
            .map_err(gql_err)?
            .ok_or_else(|| gql_err(DomainError::VendorNotFound { id }))?;
        Ok(vendor.into())
    }

    async fn promos(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        after: Option<String>,
    ) -> async_graphql::Result<ConnectionView<PromoNode>> {
        let storage = ctx.data_unchecked::<Storage>();
        let promos = storage.promos.list().map_err(gql_err)?;
        let conn = paginate(promos, first.map(i64::from), after.as_deref()).map_err(gql_err)?;
        Ok(to_view(conn))
    }

    async fn promo(&self, ctx: &Context<'_>, id: String) -> async_graphql::Result<PromoNode> {
        let storage = ctx.data_unchecked::<Storage>();
        let promo = storage
            .promos
            .find_by_id(&id)
            .map_err(gql_err)?
            .ok_or_else(|| gql_err(DomainError::PromoNotFound { id }))?;
        Ok(promo.into())
    }

    async fn promo_enrollment_requests(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        after: Option<String>,
    ) -> async_graphql::Result<ConnectionView<EnrollmentRequestView>> {
        let workflow = ctx.data_unchecked::<EnrollmentWorkflow>();
        let conn = workflow
            .select_all(first.map(i64::from), after.as_deref())
            .map_err(gql_err)?;
        Ok(to_view(conn))
    }

    async fn promo_enrollment_request(
        &self,
        ctx: &Context<'_>,
        id: String,
    ) -> async_graphql::Result<EnrollmentRequestView> {
        let workflow = ctx.data_unchecked::<EnrollmentWorkflow>();
        let request = workflow.select_one(&id).map_err(gql_err)?;
        Ok(request.into())
    }
}

// ============================================================================
// MUTATION ROOT
// ============================================================================

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_member(
        &self,
        ctx: &Context<'_>,
        input: CreateMemberInput,
    ) -> async_graphql::Result<MemberView> {
        if input.username.is_empty() {
            return Err(gql_err(DomainError::missing_input("username")));
        }
        if input.password.is_empty() {
            return Err(gql_err(DomainError::missing_input("password")));
        }

        let mut member = Member::new(input.username, hash_password(&input.password));
        member.real_name = input.real_name;
        member.email = input.email;
        member.bank_account = input.bank_account;
        member.balance = input.balance.unwrap_or(0.0);

        let storage = ctx.data_unchecked::<Storage>();
        storage.members.insert(&member).map_err(gql_err)?;
        Ok(member.into())
    }

    async fn update_member(
        &self,
        ctx: &Context<'_>,
        id: String,
        input: UpdateMemberInput,
    ) -> async_graphql::Result<MemberView> {
        let storage = ctx.data_unchecked::<Storage>();
        let mut member = storage
            .members
            .find_by_id(&id)
            .map_err(gql_err)?
            .ok_or_else(|| gql_err(DomainError::MemberNotFound { id }))?;

        member.apply_update(MemberUpdate {
            real_name: input.real_name,
            email: input.email,
            bank_account: input.bank_account,
            balance: input.balance,
        });
        storage.members.update(&member).map_err(gql_err)?;
        Ok(member.into())
    }

    async fn delete_member(
        &self,
        ctx: &Context<'_>,
        id: String,
    ) -> async_graphql::Result<bool> {
        let storage = ctx.data_unchecked::<Storage>();
        if !storage.members.delete(&id).map_err(gql_err)? {
            return Err(gql_err(DomainError::MemberNotFound { id }));
        }
        Ok(true)
    }

    async fn create_vendor(
        &self,
        ctx: &Context<'_>,
        input: CreateVendorInput,
    ) -> async_graphql::Result<VendorView> {
        if input.name.is_empty() {
            return Err(gql_err(DomainError::missing_input("name")));
        }
        let vendor = Vendor::new(input.name, input.vendor_type);
        let storage = ctx.data_unchecked::<Storage>();
        storage.vendors.insert(&vendor).map_err(gql_err)?;
        Ok(vendor.into())
    }

    async fn update_vendor(
        &self,
        ctx: &Context<'_>,
        id: String,
        input: UpdateVendorInput,
    ) -> async_graphql::Result<VendorView> {
        let storage = ctx.data_unchecked::<Storage>();
        let mut vendor = storage
            .vendors
            .find_by_id(&id)
            .map_err(gql_err)?
            .ok_or_else(|| gql_err(DomainError::VendorNotFound { id }))?;

        if let Some(name) = input.name {
            vendor.name = name;
        }
        if let Some(vendor_type) = input.vendor_type {
            vendor.vendor_type = vendor_type;
        }
        vendor.touch();
        storage.vendors.update(&vendor).map_err(gql_err)?;
        Ok(vendor.into())
    }

    async fn delete_vendor(
        &self,
        ctx: &Context<'_>,
        id: String,
    ) -> async_graphql::Result<bool> {
        let storage = ctx.data_unchecked::<Storage>();
        if !storage.vendors.delete(&id).map_err(gql_err)? {
            return Err(gql_err(DomainError::VendorNotFound { id }));
        }
        Ok(true)
    }

    async fn create_promo(
        &self,
        ctx: &Context<'_>,
        input: CreatePromoInput,
    ) -> async_graphql::Result<PromoNode> {
        if input.name.is_empty() {
            return Err(gql_err(DomainError::missing_input("name")));
        }

        let mut promo = Promo::new(input.name, input.template);
        if let Some(status) = input.status {
            promo.status = status;
        }
        promo.minimum_balance = input.minimum_balance;
        promo.required_member_fields = input.required_member_fields.unwrap_or_default();
        promo.validate_template().map_err(gql_err)?;

        let storage = ctx.data_unchecked::<Storage>();
        storage.promos.insert(&promo).map_err(gql_err)?;
        Ok(promo.into())
    }

    async fn update_promo(
        &self,
        ctx: &Context<'_>,
        id: String,
        input: UpdatePromoInput,
    ) -> async_graphql::Result<PromoNode> {
        let storage = ctx.data_unchecked::<Storage>();
        let mut promo = storage
            .promos
            .find_by_id(&id)
            .map_err(gql_err)?
            .ok_or_else(|| gql_err(DomainError::PromoNotFound { id }))?;

        if let Some(name) = input.name {
            promo.name = name;
        }
        if let Some(status) = input.status {
            promo.status = status;
        }
        if input.minimum_balance.is_some() {
            promo.minimum_balance = input.minimum_balance;
        }
        if let Some(fields) = input.required_member_fields {
            promo.required_member_fields = fields;
        }
        // the template invariant must survive every update
        promo.validate_template().map_err(gql_err)?;
        promo.touch();
        storage.promos.update(&promo).map_err(gql_err)?;
        Ok(promo.into())
    }

    async fn delete_promo(
        &self,
        ctx: &Context<'_>,
        id: String,
    ) -> async_graphql::Result<bool> {
        let storage = ctx.data_unchecked::<Storage>();
        let promo = storage
            .promos
            .find_by_id(&id)
            .map_err(gql_err)?
            .ok_or_else(|| gql_err(DomainError::PromoNotFound { id: id.clone() }))?;

        if promo.is_active() {
            return Err(gql_err(DomainError::ActivePromoDeletion { id }));
        }
        storage.promos.delete(&id).map_err(gql_err)?;
        Ok(true)
    }

    async fn enroll_to_promo(
        &self,
        ctx: &Context<'_>,
        member_id: String,
        promo_id: String,
    ) -> async_graphql::Result<bool> {
        require_auth(ctx)?;
        let engine = ctx.data_unchecked::<EligibilityEngine>();
        engine.evaluate(&promo_id, &member_id).map_err(gql_err)?;
        Ok(true)
    }

    async fn approve_promo_enrollment_request(
        &self,
        ctx: &Context<'_>,
        id: String,
    ) -> async_graphql::Result<EnrollmentRequestView> {
        require_auth(ctx)?;
        let workflow = ctx.data_unchecked::<EnrollmentWorkflow>();
        Ok(workflow.approve(&id).map_err(gql_err)?.into())
    }

    async fn process_promo_enrollment_request(
        &self,
        ctx: &Context<'_>,
        id: String,
    ) -> async_graphql::Result<EnrollmentRequestView> {
        require_auth(ctx)?;
        let workflow = ctx.data_unchecked::<EnrollmentWorkflow>();
        Ok(workflow.process(&id).map_err(gql_err)?.into())
    }

    async fn reject_promo_enrollment_request(
        &self,
        ctx: &Context<'_>,
        id: String,
    ) -> async_graphql::Result<EnrollmentRequestView> {
        require_auth(ctx)?;
        let workflow = ctx.data_unchecked::<EnrollmentWorkflow>();
        Ok(workflow.reject(&id).map_err(gql_err)?.into())
    }
}

fn require_auth(ctx: &Context<'_>) -> async_graphql::Result<()> {
    let auth = ctx.data_opt::<AuthContext>().cloned().unwrap_or_default();
    auth.require().map_err(gql_err)?;
    Ok(())
}

// ============================================================================
// SCHEMA + AXUM HANDLER
// ============================================================================

pub fn build_schema(
    storage: Storage,
    engine: EligibilityEngine,
    workflow: EnrollmentWorkflow,
) -> PlatformSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(storage)
        .data(engine)
        .data(workflow)
        .finish()
}

/// POST /graphql. The authorization context is derived once per request and
/// injected into the execution data for every resolver to consult.
pub async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let auth = state.gate.authorize(
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok()),
    );
    state
        .schema
        .execute(req.into_inner().data(auth))
        .await
        .into()
}

// ============================================================================
// TESTS
// ============================================================================
