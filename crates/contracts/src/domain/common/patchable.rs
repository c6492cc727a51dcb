use super::AggregateId;

/// Запрос на изменение, который умеет сам вычислять разницу со снимком из хранилища.
///
/// Групповое обновление пишет в хранилище только изменившиеся поля.
/// Идентификатор служит ключом и в список полей не попадает.
pub trait Patchable {
    type Id: AggregateId;
    /// Снимок записи, с которым сравниваем
    type Snapshot;
    /// Одно изменённое поле вместе с новым значением
    type Field;

    fn key(&self) -> Self::Id;

    /// Поля, отличающиеся от снимка. Пустой список: изменений нет.
    fn changed_fields(&self, snapshot: &Self::Snapshot) -> Vec<Self::Field>;
}
