use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::entity::addresses::{
    ActiveModel as AddressActive, Column as AddressCol, Entity as Addresses,
    Model as AddressModel,
};

pub struct AddressRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> AddressRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn find(&self, address_id: Uuid) -> Result<Option<AddressModel>, DbErr> {
        Addresses::find_by_id(address_id).one(self.conn).await
    }

    pub async fn find_owned(
        &self,
        user_id: Uuid,
        address_id: Uuid,
    ) -> Result<Option<AddressModel>, DbErr> {
        Addresses::find_by_id(address_id)
            .filter(AddressCol::UserId.eq(user_id))
            .one(self.conn)
            .await
    }

    /// Default address first, then oldest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<AddressModel>, DbErr> {
        Addresses::find()
            .filter(AddressCol::UserId.eq(user_id))
            .order_by_desc(AddressCol::IsDefault)
            .order_by_asc(AddressCol::CreatedAt)
            .all(self.conn)
            .await
    }

    pub async fn insert(&self, address: AddressActive) -> Result<AddressModel, DbErr> {
        address.insert(self.conn).await
    }

    /// Clear the default flag on every address of `user_id`.
    pub async fn clear_default(&self, user_id: Uuid) -> Result<(), DbErr> {
        Addresses::update_many()
            .set(AddressActive {
                is_default: sea_orm::Set(false),
                ..Default::default()
            })
            .filter(AddressCol::UserId.eq(user_id))
            .exec(self.conn)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, address: AddressModel) -> Result<(), DbErr> {
        Addresses::delete_by_id(address.id).exec(self.conn).await?;
        Ok(())
    }
}
